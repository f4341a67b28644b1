mod export;
mod ingredients;
mod links;
mod receipts;
mod tags;
mod worksteps;

pub use export::*;
pub use ingredients::*;
pub use links::*;
pub use receipts::*;
pub use tags::*;
pub use worksteps::*;

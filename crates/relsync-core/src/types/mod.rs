mod generator;
mod object_id;
mod value;

pub use generator::{Generator, generate};
pub use object_id::ObjectId;
pub use value::Value;

pub mod emitters;
pub mod error;
pub mod generator;
pub mod naming;
pub mod type_mapper;

pub use error::GenerateError;
pub use generator::{
    ModelGenerator, PlannedWrite, generate_factory_source, generate_model_source, plan_writes,
};

pub mod accident;
pub mod batch;
pub mod prediction;
pub mod user;

pub use accident::AccidentService;
pub use prediction::PredictionService;
pub use user::UserService;

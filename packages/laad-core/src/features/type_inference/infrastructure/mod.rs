pub mod constraint_solver;
pub mod inference_engine;

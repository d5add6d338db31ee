//! Strategy graph compilation: validation of the block graph, projection
//! into a flat strategy description, and the script/optimization helpers
//! that operate on the same graph.

pub mod compiled;
pub mod compiler;
pub mod optimize;
pub mod script;

pub use compiled::{
    BollingerBlock, CompiledStrategy, MacdBlock, MovingAverageBlock, RsiBlock, StochasticBlock,
    SuperTrendBlock,
};
pub use compiler::{compile, CompileError};
pub use optimize::{apply_best_params, BestParams};

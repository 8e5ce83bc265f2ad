pub mod accumulator;
pub mod dialect;
pub mod options;
pub mod position;
pub mod scanner;
pub mod splitter;
pub mod stream;


// Re-exports
pub use accumulator::Statement;
pub use dialect::Dialect;
pub use options::*;
pub use position::Position;
pub use scanner::{ScanMode, Scanner, ScannerState};
pub use splitter::*;
pub use stream::StreamSplitter;

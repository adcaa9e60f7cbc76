//! Testing utilities for code built on recordshift.
//!
//! - **Assertions**: compare record sequences regardless of row order
//! - **Fixtures**: small record sets used throughout the test suite
//! - **Mock I/O**: temporary directories, raw files and in-memory zip archives
//!
//! # Quick Start
//!
//! ```
//! use recordshift::testing::*;
//! use recordshift::{Data, Format, Locator, SerializeOptions, DeserializeOptions, serialize, deserialize};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = TempDirPath::new()?;
//! let dest = Locator::local(dir.file_path("greetings.jsonl"));
//! serialize(&dest, Data::Records(greetings()), &SerializeOptions::new(Format::Jsonl))?;
//! let back = deserialize(&dest, &DeserializeOptions::new(Format::Jsonl))?.into_records()?;
//! assert_records_unordered_eq(&back, &greetings(), "order");
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use fixtures::*;
pub use mock_io::*;

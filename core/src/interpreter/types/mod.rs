pub mod cell;
pub mod control;
pub mod values;

pub use cell::{Atom, Cell, Globals, ScanEnv, Temp};
pub use control::{Signal, Step};
pub use values::{Key, List, Numeric, Record, Set, Table, Value};

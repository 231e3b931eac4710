//! Sheetsmith Engine library.
//!
//! Compiles character-creation content records into derivation rules for an
//! external rule-evaluation engine.
//!
//! ## Structure
//!
//! - `compilers/` - One choice compiler per content kind, plus bonus patterns
//! - `dispatcher/` - Record routing, merge ledger and registration
//! - `infrastructure/` - The `RuleSink` port, the in-memory `RuleSet` and settings
//! - `content_tables` - Bundled sample content

pub mod compilers;
pub mod content_tables;
pub mod dispatcher;
pub mod infrastructure;

pub use compilers::{Catalog, RecordOutput};
pub use dispatcher::{CompileReport, Compiler};
pub use infrastructure::ports::RuleSink;
pub use infrastructure::rule_set::RuleSet;
pub use infrastructure::settings::{CompilerSettings, SettingsError};

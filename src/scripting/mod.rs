pub mod zone_script;

pub use zone_script::{FnScript, ScriptAction, ScriptError, ZoneScript, ZoneView};

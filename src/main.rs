//! Previz editor console.
//!
//! Reads commands from stdin and drives an editor session without an
//! engine attached. Set `PREVIZ_EDITOR_CONFIG` to point at a TOML config.

fn main() {
    previz_editor::app::run();
}

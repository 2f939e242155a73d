pub mod arpeggiator;
pub mod config;
pub mod highlight;
pub mod music;
pub mod note;
pub mod voice;

pub use arpeggiator::{ArpPattern, ArpeggiatorConfig};
pub use config::{PlayerConfig, TheorySettings};
pub use highlight::KeyHighlight;
pub use music::{Key, Scale};
pub use note::Note;
pub use voice::{Instrument, Voice};

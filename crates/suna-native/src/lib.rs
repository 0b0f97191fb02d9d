//! # suna-native
//!
//! Embedded backend for the Suna bridge. The DSP runs inside a native plugin
//! host; this crate forwards the [`RuntimeAdapter`](suna_core::RuntimeAdapter)
//! surface to it as named function calls:
//!
//! | call | native function | arguments |
//! |------|-----------------|-----------|
//! | `load_sample` | `loadSample` | `[slot, base64 PCM, sample rate]` |
//! | `clear_slot` | `clearSlot` | `[slot]` |
//! | `play_all` / `stop_all` | `playAll` / `stopAll` | `[]` |
//! | parameter writes | `set<Id>` | `[value]` |

pub mod adapter;
pub mod host;
pub mod payload;

pub use adapter::EmbeddedAdapter;
pub use host::{native_argument, native_setter_name, NativeHost};
pub use payload::{decode_pcm, encode_pcm};

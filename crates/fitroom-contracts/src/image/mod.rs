mod codec;
mod encoded;

pub use codec::{encode_file, export, mime_for_path, DEFAULT_EXPORT_FILENAME};
pub use encoded::{CodecError, EncodedImage};

pub mod stream;

pub use stream::{fingerprint_bytes, fingerprint_file, CHUNK_SIZE, FINGERPRINT_LEN, HASH_NAME};

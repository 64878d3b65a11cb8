// 検証ドメイン
// 電話番号、住所（ジオコーディング）、過去記録との重複

pub mod address;
pub mod duplicate;
pub mod geocoder;
pub mod per_record;
pub mod phone;
pub mod similarity;

// 公開API
pub use address::{center_for_state, confidence, AddressValidator, ADDRESS_FIELD};
pub use duplicate::{clean_address, DuplicateDetector, DEFAULT_SIMILARITY_THRESHOLD};
pub use geocoder::{GeocodeError, GeocodeMatch, Geocoder, GoogleGeocoder};
pub use per_record::PerRecordProcessor;
pub use phone::{standardize_phone, PhoneValidator, PHONE_FIELD};
pub use similarity::{address_similarity, sequence_ratio};

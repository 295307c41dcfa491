/// Business logic layer for posts-service
///
/// - coordinator: post create/update/delete with owner bookkeeping
/// - users: signup, login and profile updates
/// - geocoding: address lookup behind the `Geocoder` trait
/// - storage: uploaded image files behind the `FileStorage` trait
pub mod coordinator;
pub mod geocoding;
pub mod storage;
pub mod users;

pub use coordinator::PostCoordinator;
pub use geocoding::{DisabledGeocoder, GeocodeError, Geocoder, GoogleGeocoder};
pub use storage::{FileStorage, LocalFileStorage, StorageError};
pub use users::{Session, UserDirectory};

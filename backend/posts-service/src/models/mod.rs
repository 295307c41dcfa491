/// Data models for posts-service
///
/// - User: account record owning a set of post ids
/// - Post: location-tagged post with exactly one owner
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic coordinates resolved from an address
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Account record. Never serialized directly; see [`UserView`].
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
    pub post_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            image,
            post_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn owns(&self, post_id: Uuid) -> bool {
        self.post_ids.contains(&post_id)
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            image: self.image.clone(),
            post_ids: self.post_ids.clone(),
        }
    }
}

/// Public projection of a user, without the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub post_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub image: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(owner_id: Uuid, fields: NewPost, location: Option<Location>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            address: fields.address,
            location,
            image: fields.image,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Flat row shape of the `posts` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub image: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Some(Location { lat, lng }),
            _ => None,
        };

        Post {
            id: row.id,
            title: row.title,
            description: row.description,
            address: row.address,
            location,
            image: row.image,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Caller-supplied fields for a new post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub address: Option<String>,
    pub image: Option<String>,
}

/// Replacement fields for an existing post. Absent values become empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_view_omits_password_hash() {
        let user = User::new(
            "Ann".into(),
            "ann@x.com".into(),
            "$argon2id$v=19$secret".into(),
            None,
        );
        let json = serde_json::to_value(user.view()).unwrap();

        assert_eq!(json["email"], "ann@x.com");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["post_ids"], serde_json::json!([]));
    }

    #[test]
    fn test_post_row_location_requires_both_coordinates() {
        let now = Utc::now();
        let row = PostRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: "d".into(),
            address: Some("somewhere".into()),
            latitude: Some(51.5),
            longitude: None,
            image: None,
            owner_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };

        assert_eq!(Post::from(row.clone()).location, None);

        let row = PostRow {
            longitude: Some(-0.15),
            ..row
        };
        assert_eq!(
            Post::from(row).location,
            Some(Location {
                lat: 51.5,
                lng: -0.15
            })
        );
    }
}

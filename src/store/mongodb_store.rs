use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::{ClientOptions, FindOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Donation, Session, User};
use crate::store::Store;

/// The config struct for MongoDB connections.
/// Contains the URI and database name.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct MongoDBConfig {
    pub uri: String,
    pub database: String,
}

/// A concrete `Store` implementation that uses MongoDB.
///
/// Each record is wrapped in a document with its own `_id`, so the domain
/// types stay free of driver-specific fields.
pub struct MongoDBStore {
    user_collection: Collection<UserDocument>,
    session_collection: Collection<SessionDocument>,
    donation_collection: Collection<DonationDocument>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct UserDocument {
    _id: ObjectId,
    password_hash: String,
    user: User,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct SessionDocument {
    _id: ObjectId,
    session: Session,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct DonationDocument {
    _id: ObjectId,
    donation: Donation,
}

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code, .. })) if *code == DUPLICATE_KEY
    )
}

fn index(keys: Document, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(unique).build())
        .build()
}

impl MongoDBStore {
    /// Connects and makes sure the indexes exist.
    pub async fn new(config: &MongoDBConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB database '{}'", config.database);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;
        client_options.app_name = Some("donation-tracker".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        let database = client.database(&config.database);
        let user_collection = database.collection::<UserDocument>("users");
        let session_collection = database.collection::<SessionDocument>("sessions");
        let donation_collection = database.collection::<DonationDocument>("donations");

        user_collection
            .create_index(index(doc! { "user.username": 1 }, true), None)
            .await
            .map_err(|e| format!("Failed to create unique index on username: {}", e))?;
        user_collection
            .create_index(index(doc! { "user.id": 1 }, true), None)
            .await
            .map_err(|e| format!("Failed to create unique index on user id: {}", e))?;
        session_collection
            .create_index(index(doc! { "session.token": 1 }, true), None)
            .await
            .map_err(|e| format!("Failed to create unique index on session token: {}", e))?;
        donation_collection
            .create_index(index(doc! { "donation.user_id": 1 }, false), None)
            .await
            .map_err(|e| format!("Failed to create index on donation owner: {}", e))?;

        info!("MongoDB connection established successfully.");

        Ok(Self {
            user_collection,
            session_collection,
            donation_collection,
        })
    }
}

#[async_trait]
impl Store for MongoDBStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<bool, String> {
        let document = UserDocument {
            _id: ObjectId::new(),
            password_hash: password_hash.to_string(),
            user: user.clone(),
        };
        // The unique username index decides races between registrations.
        match self.user_collection.insert_one(document, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => {
                debug!("Username '{}' already registered.", user.username);
                Ok(false)
            }
            Err(e) => Err(format!("Failed to insert user document: {}", e)),
        }
    }

    async fn find_credentials(&self, username: &str) -> Result<Option<(User, String)>, String> {
        let document = self
            .user_collection
            .find_one(doc! { "user.username": username }, None)
            .await
            .map_err(|e| format!("Failed to query user: {}", e))?;
        Ok(document.map(|d| (d.user, d.password_hash)))
    }

    async fn count_users(&self) -> Result<u64, String> {
        self.user_collection
            .count_documents(doc! {}, None)
            .await
            .map_err(|e| format!("Failed to count users: {}", e))
    }

    async fn add_session(&self, session: &Session) -> Result<(), String> {
        let document = SessionDocument {
            _id: ObjectId::new(),
            session: session.clone(),
        };
        self.session_collection
            .insert_one(document, None)
            .await
            .map_err(|e| format!("Failed to insert session: {}", e))?;
        Ok(())
    }

    async fn get_session_user(&self, token: &str, now: i64) -> Result<Option<User>, String> {
        let session = self
            .session_collection
            .find_one(doc! { "session.token": token }, None)
            .await
            .map_err(|e| format!("Failed to query session: {}", e))?;

        let session = match session {
            Some(d) if !d.session.is_expired(now) => d.session,
            _ => return Ok(None),
        };

        let user = self
            .user_collection
            .find_one(doc! { "user.id": &session.user_id }, None)
            .await
            .map_err(|e| format!("Failed to fetch user by id: {}", e))?;
        Ok(user.map(|d| d.user))
    }

    async fn delete_session(&self, token: &str) -> Result<(), String> {
        self.session_collection
            .delete_one(doc! { "session.token": token }, None)
            .await
            .map_err(|e| format!("Failed to delete session: {}", e))?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: i64) -> Result<u64, String> {
        let result = self
            .session_collection
            .delete_many(doc! { "session.expires_at": { "$lte": now } }, None)
            .await
            .map_err(|e| format!("Failed to delete expired sessions: {}", e))?;
        Ok(result.deleted_count)
    }

    async fn add_donation(&self, donation: &Donation) -> Result<(), String> {
        let document = DonationDocument {
            _id: ObjectId::new(),
            donation: donation.clone(),
        };
        self.donation_collection
            .insert_one(document, None)
            .await
            .map_err(|e| format!("Failed to insert donation: {}", e))?;
        Ok(())
    }

    async fn list_donations(&self, user_id: Option<&str>) -> Result<Vec<Donation>, String> {
        let filter = match user_id {
            Some(id) => doc! { "donation.user_id": id },
            None => doc! {},
        };
        let options = FindOptions::builder()
            .sort(doc! { "donation.created_at": -1 })
            .build();

        let mut cursor = self
            .donation_collection
            .find(filter, options)
            .await
            .map_err(|e| format!("Failed to list donations: {}", e))?;

        let mut donations = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| format!("Failed to read donation document: {}", e))?
        {
            donations.push(document.donation);
        }
        Ok(donations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn session_document_keeps_token_path_used_by_index() {
        let session = Session::issue("user-1", 60);
        let document = bson::to_document(&SessionDocument {
            _id: ObjectId::new(),
            session: session.clone(),
        })
        .expect("session should serialize");

        let nested = document.get_document("session").expect("nested session");
        assert_eq!(nested.get_str("token").unwrap(), session.token);
        assert_eq!(nested.get_i64("expires_at").unwrap(), session.expires_at);
    }

    #[test]
    fn user_document_never_nests_password_inside_user() {
        let user = User::new("alice".to_string(), "a@example.com".to_string(), None);
        let document = bson::to_document(&UserDocument {
            _id: ObjectId::new(),
            password_hash: "hash".to_string(),
            user,
        })
        .expect("user should serialize");

        let nested = document.get_document("user").expect("nested user");
        assert!(!nested.contains_key("password_hash"));
        assert_eq!(nested.get_str("username").unwrap(), "alice");
    }

    /// Runs against a real server only when `MONGODB_TEST_URI` is set.
    #[tokio::test]
    async fn racing_registrations_yield_one_conflict() {
        let uri = match std::env::var("MONGODB_TEST_URI") {
            Ok(uri) => uri,
            Err(_) => return,
        };
        let store = MongoDBStore::new(&MongoDBConfig {
            uri,
            database: format!("donation_tracker_test_{}", uuid::Uuid::new_v4().simple()),
        })
        .await
        .expect("test database should be reachable");

        let first = User::new("racer".to_string(), "a@example.com".to_string(), None);
        let second = User::new("racer".to_string(), "b@example.com".to_string(), None);
        let (a, b) = tokio::join!(
            store.create_user(&first, "hash-a"),
            store.create_user(&second, "hash-b"),
        );

        let mut outcomes = vec![a.expect("no store error"), b.expect("no store error")];
        outcomes.sort();
        assert_eq!(outcomes, vec![false, true]);
        assert_eq!(store.count_users().await.unwrap(), 1);
    }
}

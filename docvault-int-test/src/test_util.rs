use docvault::document::Payload;
use docvault::remote::InMemoryRemote;
use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs, thread};

/// Working directory of one integration test: store locations and archive
/// files all live underneath it.
#[derive(Clone)]
pub struct TestContext {
    root: PathBuf,
}

impl TestContext {
    pub fn new() -> TestContext {
        let root = random_path();
        fs::create_dir_all(&root).expect("failed to create test directory");
        TestContext { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn store_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(id.to_string())
}

/// Removes the test directory with retry logic; the storage engine may still
/// be releasing file handles when the test finishes.
pub fn cleanup(ctx: TestContext) {
    let path = ctx.root.clone();
    let max_retries = 15;

    for retry in 0..max_retries {
        if !path.exists() {
            return;
        }
        match fs::remove_dir_all(&path) {
            Ok(_) => return,
            Err(_) if retry < max_retries - 1 => {
                thread::sleep(Duration::from_millis(50 * (retry as u64 + 1)));
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to remove test directory {} after {} attempts: {:?}",
                    path.display(),
                    max_retries,
                    e
                );
            }
        }
    }
}

pub fn payload(n: i64) -> Payload {
    let mut map = Payload::new();
    map.insert("n".to_string(), serde_json::json!(n));
    map.insert("label".to_string(), serde_json::json!(format!("item-{}", n)));
    map
}

/// Seeds a remote with `users` (3 documents), `orders` (2 documents) and an
/// empty `audit` collection.
pub fn seeded_remote() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.insert("users", "u1", payload(1));
    remote.insert("users", "u2", payload(2));
    remote.insert("users", "u3", payload(3));
    remote.insert("orders", "o1", payload(10));
    remote.insert("orders", "o2", payload(11));
    remote.create_collection("audit");
    remote
}

/// Asserts that two remotes hold the same documents in the given collections.
pub fn assert_same_documents(left: &InMemoryRemote, right: &InMemoryRemote, collections: &[&str]) {
    for collection in collections {
        assert_eq!(
            left.documents_in(collection),
            right.documents_in(collection),
            "collection '{}' differs",
            collection
        );
    }
}

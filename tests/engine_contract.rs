//! Behaviour both engines share, run against every available backend

use std::sync::Arc;

use hbnb_storage::domain::entity::{Amenity, City, State, User};
use hbnb_storage::infrastructure::storage::{
    PostgresConfig, PostgresStorage, StorageConfig, StorageFactory,
};
use hbnb_storage::{DomainError, EntityClass, Record, StorageEngine};
use tempfile::TempDir;

async fn file_engine(dir: &TempDir) -> Arc<dyn StorageEngine> {
    StorageFactory::create(&StorageConfig::file(dir.path().join("file.json")))
        .await
        .unwrap()
}

/// Engine over the disposable database in `TEST_DATABASE_URL`; with
/// `drop_on_reload` every reload starts from empty tables
async fn database_engine(drop_on_reload: bool) -> Option<Arc<dyn StorageEngine>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = sqlx::PgPool::connect(&url).await.unwrap();
    let engine = PostgresStorage::new(pool, drop_on_reload);
    engine.reload().await.unwrap();
    Some(Arc::new(engine))
}

async fn check_scenario(storage: &dyn StorageEngine) {
    let state = State::new("California");
    let city = City::new(state.base.id(), "San_Jose");
    let state = Record::from(state);
    let city = Record::from(city);

    storage.new(state.clone()).await.unwrap();
    storage.save().await.unwrap();
    storage.new(city.clone()).await.unwrap();
    storage.save().await.unwrap();

    let all = storage.all(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.get(&format!("State.{}", state.id())), Some(&state));
    assert_eq!(all.get(&format!("City.{}", city.id())), Some(&city));

    let states = storage.all(Some(EntityClass::State)).await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states.values().next(), Some(&state));
}

async fn check_round_trip_and_reload(storage: &dyn StorageEngine) {
    let user = Record::from(User::new("poppy@holberton.com", "betty").with_name("Poppy", "Seed"));
    storage.new(user.clone()).await.unwrap();
    storage.save().await.unwrap();

    storage.reload().await.unwrap();
    storage.reload().await.unwrap();

    let users = storage.all(Some(EntityClass::User)).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users.get(&user.storage_key()), Some(&user));
}

async fn check_class_filter(storage: &dyn StorageEngine) {
    for name in ["Wifi", "Pool", "Parking"] {
        storage.new(Amenity::new(name).into()).await.unwrap();
    }
    for name in ["Oregon", "Nevada"] {
        storage.new(State::new(name).into()).await.unwrap();
    }
    storage.save().await.unwrap();

    assert_eq!(storage.count(Some(EntityClass::Amenity)).await.unwrap(), 3);
    assert_eq!(storage.count(Some(EntityClass::State)).await.unwrap(), 2);
    assert_eq!(storage.count(None).await.unwrap(), 5);
}

async fn check_rejections(storage: &dyn StorageEngine) {
    let err = storage.all_named("NotARealClass").await.unwrap_err();
    assert!(matches!(err, DomainError::UnknownClass { .. }));

    let before = storage.count(None).await.unwrap();
    storage.delete(None).await.unwrap();
    assert_eq!(storage.count(None).await.unwrap(), before);
}

async fn check_delete_after_save(storage: &dyn StorageEngine) {
    let amenity = Record::from(Amenity::new("Sauna"));
    storage.new(amenity.clone()).await.unwrap();
    storage.save().await.unwrap();

    storage.delete(Some(&amenity)).await.unwrap();
    storage.save().await.unwrap();

    let found = storage
        .get(EntityClass::Amenity, amenity.id())
        .await
        .unwrap();
    assert!(found.is_none());
}

/// Callers sharing one engine through clones of its handle
async fn check_concurrent_callers(storage: Arc<dyn StorageEngine>) {
    let tasks: Vec<_> = (0..8)
        .map(|n| {
            let storage = Arc::clone(&storage);
            tokio::spawn(async move {
                storage.new(Amenity::new(format!("Amenity_{}", n)).into()).await?;
                storage.save().await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(storage.count(Some(EntityClass::Amenity)).await.unwrap(), 8);
}

#[tokio::test]
async fn file_engine_scenario() {
    let dir = TempDir::new().unwrap();
    check_scenario(file_engine(&dir).await.as_ref()).await;
}

#[tokio::test]
async fn file_engine_round_trip_and_reload() {
    let dir = TempDir::new().unwrap();
    check_round_trip_and_reload(file_engine(&dir).await.as_ref()).await;
}

#[tokio::test]
async fn file_engine_class_filter() {
    let dir = TempDir::new().unwrap();
    check_class_filter(file_engine(&dir).await.as_ref()).await;
}

#[tokio::test]
async fn file_engine_rejections() {
    let dir = TempDir::new().unwrap();
    check_rejections(file_engine(&dir).await.as_ref()).await;
}

#[tokio::test]
async fn file_engine_delete_after_save() {
    let dir = TempDir::new().unwrap();
    check_delete_after_save(file_engine(&dir).await.as_ref()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_engine_concurrent_callers() {
    let dir = TempDir::new().unwrap();
    check_concurrent_callers(file_engine(&dir).await).await;

    let fresh = file_engine(&dir).await;
    assert_eq!(fresh.count(Some(EntityClass::Amenity)).await.unwrap(), 8);
}

// One test drives the database so the checks never race on the shared schema
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn database_engine_contract() {
    let Some(storage) = database_engine(true).await else {
        eprintln!("Skipping test: TEST_DATABASE_URL not set");
        return;
    };

    check_scenario(storage.as_ref()).await;

    check_class_filter(database_engine(true).await.unwrap().as_ref()).await;
    check_rejections(database_engine(true).await.unwrap().as_ref()).await;
    check_delete_after_save(database_engine(true).await.unwrap().as_ref()).await;
    check_concurrent_callers(database_engine(true).await.unwrap()).await;

    // Clean once, then reload without teardown so committed rows must survive
    database_engine(true).await.unwrap();
    check_round_trip_and_reload(database_engine(false).await.unwrap().as_ref()).await;
}

#[tokio::test]
async fn unreachable_database_fails_bootstrap() {
    let config = PostgresConfig::new("127.0.0.1", "nobody", "nothing", "none")
        .with_port(1)
        .with_connect_timeout(2);

    let result = StorageFactory::create(&StorageConfig::database(config)).await;
    assert!(matches!(result, Err(DomainError::Storage { .. })));
}

//! PostgreSQL test container
//!
//! Each [`TestDatabase`] owns a fresh container migrated with the same
//! embedded migrations the server runs. Helpers seed the users and boats that
//! bookings reference, since both are foreign keys.

use std::time::Duration;

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use core_kernel::{BoatId, UserId};
use domain_booking::{Boat, PricingMode, SystemActors};
use infra_db::repositories::boat::{BoatRepository, NewBoat, PricingMode as DbPricingMode};
use infra_db::repositories::user::{NewUser, UserRepository, UserRole};
use infra_db::{create_pool, DatabaseConfig, DatabasePool, PostgresBookingAdapter};

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "boat_charter_test";

/// Connection URL for the test container reachable at `host:port`
pub fn container_url(host: &str, port: u16) -> String {
    format!("postgres://{POSTGRES_USER}:{POSTGRES_PASSWORD}@{host}:{port}/{POSTGRES_DB}")
}

/// A migrated PostgreSQL container and a pool connected to it
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub url: String,
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Starts a container and applies all migrations
    pub async fn new() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();
        let url = container_url(&host, port);

        // Enough connections for the concurrent-create tests
        let pool = create_pool(
            DatabaseConfig::new(url.clone())
                .max_connections(10)
                .min_connections(1)
                .acquire_timeout(Duration::from_secs(30)),
        )
        .await?;
        infra_db::run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// A booking adapter over this database
    pub fn adapter(&self) -> PostgresBookingAdapter {
        PostgresBookingAdapter::new(self.pool.clone())
    }

    /// Clears all data while preserving the schema
    pub async fn clear_data(&self) -> TestResult<()> {
        sqlx::query("TRUNCATE TABLE bookings, boats, users CASCADE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a member user with a generated name and email
    pub async fn seed_user(&self) -> TestResult<UserId> {
        let user_id = UserId::new();
        let email: String = SafeEmail().fake();
        UserRepository::new(self.pool.clone())
            .insert(&NewUser {
                user_id: user_id.into(),
                // Prefix keeps generated addresses unique across seeds
                email: format!("{}.{email}", uuid::Uuid::from(user_id).simple()),
                display_name: Name().fake(),
                role: UserRole::Member,
            })
            .await?;
        Ok(user_id)
    }

    /// Creates the system and admin users
    pub async fn seed_system_actors(&self, actors: &SystemActors) -> TestResult<()> {
        infra_db::ensure_system_actors(&self.pool, actors).await?;
        Ok(())
    }

    /// Inserts `boat`; its host must already exist
    pub async fn seed_boat(&self, boat: &Boat) -> TestResult<()> {
        let capacity = i32::try_from(boat.capacity)?;
        BoatRepository::new(self.pool.clone())
            .insert(&NewBoat {
                boat_id: boat.id.into(),
                host_id: boat.host_id.into(),
                name: boat.name.clone(),
                capacity,
                hourly_rate: boat.hourly_rate.amount(),
                daily_rate: boat.daily_rate.amount(),
                currency: boat.hourly_rate.currency().code().to_string(),
                pricing_mode: match boat.pricing_mode {
                    PricingMode::Hourly => DbPricingMode::Hourly,
                    PricingMode::Daily => DbPricingMode::Daily,
                },
                is_available: boat.is_available,
            })
            .await?;
        Ok(())
    }

    /// Number of non-cancelled bookings stored for `boat_id`
    pub async fn count_active_bookings(&self, boat_id: BoatId) -> TestResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE boat_id = $1 AND status <> 'cancelled'",
        )
        .bind(uuid::Uuid::from(boat_id))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

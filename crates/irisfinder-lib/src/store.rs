//! Geodesic radius search over IRIS zones.
//!
//! [`IrisStore`] is the seam between HTTP handlers and the data. The production
//! implementation, [`PgIrisStore`], delegates all spatial work to PostGIS: one
//! statement computes the candidate set with `ST_DWithin` on `geography`
//! (great-circle distance on the spheroid, in metres), counts it, and
//! aggregates the requested page into a JSON array.
//!
//! ```text
//! WITH candidates AS (SELECT * FROM <table> WHERE ST_DWithin(...))
//! SELECT (SELECT COUNT(*) FROM candidates)        AS total,
//!        (SELECT json_agg(page) FROM (... LIMIT OFFSET) AS page) AS results
//! ```
//!
//! Parameters are bound positionally: `$1` longitude, `$2` latitude (the point
//! is built longitude first), `$3` radius in metres, `$4` limit, `$5` offset.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde_json::Value;
use tokio_postgres::NoTls;
use tracing::debug;

use crate::config::{DatabaseConfig, IrisSource, TlsMode};
use crate::criteria::{IrisZone, SearchCriteria, SearchPage};
use crate::error::{Error, Result};
use crate::tls;

/// Anything that can answer a paginated geodesic radius search.
#[async_trait]
pub trait IrisStore: Send + Sync {
    /// Count every zone within `criteria.radius_km` of the point and return the
    /// requested page of them.
    async fn find_within(&self, criteria: &SearchCriteria) -> Result<SearchPage>;
}

/// Render the single search statement for the given source table.
pub fn build_search_sql(source: &IrisSource) -> String {
    format!(
        "WITH candidates AS (\n\
         \x20   SELECT * FROM {table}\n\
         \x20   WHERE ST_DWithin(\n\
         \x20       {geom}::geography,\n\
         \x20       ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography,\n\
         \x20       $3\n\
         \x20   )\n\
         )\n\
         SELECT\n\
         \x20   (SELECT COUNT(*) FROM candidates) AS total,\n\
         \x20   (SELECT COALESCE(json_agg(page), '[]'::json)\n\
         \x20      FROM (SELECT * FROM candidates ORDER BY {order} LIMIT $4 OFFSET $5) AS page\n\
         \x20   ) AS results",
        table = source.table.quoted(),
        geom = source.geometry_column.quoted(),
        order = source.order_column.quoted(),
    )
}

/// Build the connection pool described by `config`.
///
/// No connection is opened here; the first checkout dials the server.
pub fn build_pool(config: &DatabaseConfig) -> Result<Pool> {
    let pg_config: tokio_postgres::Config =
        config.url.parse().map_err(Error::InvalidDatabaseUrl)?;

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let manager = match config.tls {
        TlsMode::Disable => Manager::from_config(pg_config, NoTls, manager_config),
        TlsMode::Insecure => {
            Manager::from_config(pg_config, tls::insecure_connector()?, manager_config)
        }
        TlsMode::Verify => {
            Manager::from_config(pg_config, tls::verifying_connector()?, manager_config)
        }
    };

    let mut builder = Pool::builder(manager)
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1);
    if let Some(timeout) = config.pool_timeout {
        builder = builder
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout));
    }

    Ok(builder.build()?)
}

/// PostGIS-backed [`IrisStore`] sharing one connection pool across requests.
#[derive(Clone)]
pub struct PgIrisStore {
    pool: Pool,
    sql: String,
}

impl PgIrisStore {
    pub fn new(pool: Pool, source: &IrisSource) -> Self {
        Self {
            pool,
            sql: build_search_sql(source),
        }
    }

    /// Build the pool and the store in one step.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = build_pool(config)?;
        Ok(Self::new(pool, &config.source))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Close the pool. Checked-out connections are dropped when returned.
    pub fn close(&self) {
        self.pool.close();
    }
}

impl std::fmt::Debug for PgIrisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgIrisStore")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

#[async_trait]
impl IrisStore for PgIrisStore {
    async fn find_within(&self, criteria: &SearchCriteria) -> Result<SearchPage> {
        let limit = i64::from(criteria.limit);
        let offset = criteria.offset();
        let radius_m = criteria.radius_meters();

        debug!(
            longitude = criteria.longitude,
            latitude = criteria.latitude,
            radius_m,
            limit,
            offset,
            "executing IRIS radius query"
        );

        let client = self.pool.get().await?;
        let statement = client.prepare_cached(&self.sql).await?;
        let row = client
            .query_one(
                &statement,
                &[
                    &criteria.longitude,
                    &criteria.latitude,
                    &radius_m,
                    &limit,
                    &offset,
                ],
            )
            .await?;

        let total: i64 = row.try_get("total")?;
        let results: Option<Value> = row.try_get("results")?;

        Ok(SearchPage {
            total,
            results: decode_zones(results)?,
        })
    }
}

/// Decode the `json_agg` column. SQL `NULL` means an empty page.
fn decode_zones(value: Option<Value>) -> Result<Vec<IrisZone>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqlIdentifier;
    use serde_json::json;

    #[test]
    fn default_sql_uses_geography_and_longitude_first() {
        let sql = build_search_sql(&IrisSource::default());

        assert!(sql.contains("SELECT * FROM \"iris\""));
        assert!(sql.contains("\"geom\"::geography"));
        assert!(sql.contains("ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography"));
        assert!(sql.contains("COUNT(*) FROM candidates) AS total"));
        assert!(sql.contains("ORDER BY \"code_iris\" LIMIT $4 OFFSET $5"));
        assert!(sql.contains("AS results"));
    }

    #[test]
    fn sql_binds_five_parameters_and_no_literals() {
        let sql = build_search_sql(&IrisSource::default());
        for n in 1..=5 {
            assert!(sql.contains(&format!("${}", n)), "missing ${}", n);
        }
        assert!(!sql.contains("$6"));
        assert!(!sql.contains("1000"));
    }

    #[test]
    fn sql_quotes_configured_identifiers() {
        let source = IrisSource {
            table: SqlIdentifier::parse("insee.iris_ge").unwrap(),
            geometry_column: SqlIdentifier::parse("the_geom").unwrap(),
            order_column: SqlIdentifier::parse("nom_iris").unwrap(),
        };
        let sql = build_search_sql(&source);

        assert!(sql.contains("FROM \"insee\".\"iris_ge\""));
        assert!(sql.contains("\"the_geom\"::geography"));
        assert!(sql.contains("ORDER BY \"nom_iris\""));
    }

    #[test]
    fn decode_null_aggregate_as_empty() {
        assert!(decode_zones(None).unwrap().is_empty());
        assert!(decode_zones(Some(Value::Null)).unwrap().is_empty());
        assert!(decode_zones(Some(json!([]))).unwrap().is_empty());
    }

    #[test]
    fn decode_keeps_every_column() {
        let zones = decode_zones(Some(json!([
            {"code_iris": "751010101", "nom_iris": "Halles 1", "typ_iris": "H"},
            {"code_iris": "751010102", "nom_iris": "Halles 2", "typ_iris": "H"}
        ])))
        .unwrap();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].code(), Some("751010101"));
        assert_eq!(zones[1].name(), Some("Halles 2"));
        assert_eq!(zones[1].get("typ_iris"), Some(&json!("H")));
    }

    #[test]
    fn decode_rejects_non_array() {
        let err = decode_zones(Some(json!({"code_iris": "x"}))).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_database_surfaces_as_error() {
        let mut config = DatabaseConfig::new("postgres://iris@127.0.0.1:1/iris");
        config.tls = TlsMode::Disable;
        config.pool_timeout = Some(std::time::Duration::from_secs(2));

        let store = PgIrisStore::connect(&config).expect("pool builds lazily");
        let result = store
            .find_within(&SearchCriteria::new(48.8566, 2.3522, 1.0))
            .await;

        assert!(matches!(result, Err(Error::Pool(_))));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let mut config = DatabaseConfig::new("postgres://iris@localhost:notaport/iris");
        config.tls = TlsMode::Disable;
        assert!(matches!(
            build_pool(&config),
            Err(Error::InvalidDatabaseUrl(_))
        ));
    }
}

//! MySQL access for source routes, reference tables, and crawl rows.

use std::time::Duration;

use rcs_core::{
    AirportRecord, EndpointRecord, FlightRecord, HourWindow, PlaceType, RouteType, SourceRoute,
    TargetRoute,
};
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{MySql, Row};
use tracing::{debug, error, warn};

use crate::{
    build_condition, display_params, plan_upsert, Condition, Criteria, FieldMap, Operators,
    RouteTables, Selection, SqlValue, StoreError, TableSchema, UpsertStatement,
};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Whether a write runs on its own autocommitted statement or inside a
/// transaction that is committed when the call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    #[default]
    Autocommit,
    Transaction,
}

/// Which crawl columns a write carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldCoverage {
    /// Optional derived columns (place ids, place types, flight, remark) are
    /// only written when set, so a conflict keeps their stored values.
    #[default]
    Derived,
    /// Every column is written, NULLs included.
    Complete,
}

/// Result of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted { id: i64 },
    Updated,
    NoOp,
}

impl UpsertOutcome {
    /// `existed` is whether the key was present before the write. sqlx-mysql
    /// connects with CLIENT_FOUND_ROWS, so an existing row rewritten with its
    /// current values reports 1 affected row, the same as an insert; a changed
    /// row reports 2.
    pub fn from_write(existed: bool, rows_affected: u64, last_insert_id: u64, key: Option<i64>) -> Self {
        match (existed, rows_affected) {
            (_, 0) => UpsertOutcome::NoOp,
            (false, _) => {
                let id = i64::try_from(last_insert_id)
                    .ok()
                    .filter(|id| *id > 0)
                    .or(key)
                    .unwrap_or_default();
                UpsertOutcome::Inserted { id }
            }
            (true, 1) => UpsertOutcome::NoOp,
            (true, _) => UpsertOutcome::Updated,
        }
    }
}

/// An upsert failure that is an expected secondary-key conflict resolves to
/// `NoOp`; anything else is handed back to the caller.
pub(crate) fn absorb_duplicate_entry(err: sqlx::Error, key: Option<i64>) -> Result<UpsertOutcome, sqlx::Error> {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            warn!(?key, error = %db_err, "record already exists; upsert skipped");
            Ok(UpsertOutcome::NoOp)
        }
        _ => Err(err),
    }
}

const SOURCE_ROUTE_QUERY: &str = "select CAST(srt.id AS SIGNED) as spp_route_id,
    srt.name as route_name, srt.from_place, srt.to_place,
    CAST(srt.from_place_lat_lng AS CHAR) as from_place_lat_lng,
    CAST(srt.to_place_lat_lng AS CHAR) as to_place_lat_lng,
    srt.from_address, srt.to_address,
    srt.platform_name as platform_name,
    CAST(srt.partner_id AS SIGNED) as partner_id,
    CAST(srt.service_area_id_elife AS SIGNED) as service_area_id,
    CAST(srt.json AS CHAR) as route_json,
    CAST(srt.is_active AS SIGNED) as is_active,
    CAST(srt.batch AS CHAR) as batch,
    CAST(srt.crawl_state AS SIGNED) as crawl_state,
    CAST(srt.disable_date AS DATE) as disable_date,
    srt.{tz_column} as tz
    from {source_table} srt
    where {condition}
    order by srt.id asc";

const CRAWL_ROUTE_QUERY: &str = "select CAST(id AS SIGNED) as id,
    route_name,
    CAST(partner_id AS SIGNED) as partner_id,
    platform_name,
    CAST(service_area_id AS SIGNED) as service_area_id,
    CAST(disable_date AS DATE) as disable_date,
    start_place_name_manual,
    CAST(start_place_lat AS DOUBLE) as start_place_lat,
    CAST(start_place_lng AS DOUBLE) as start_place_lng,
    start_place_google_place_id,
    start_place_type,
    end_place_name_manual,
    CAST(end_place_lat AS DOUBLE) as end_place_lat,
    CAST(end_place_lng AS DOUBLE) as end_place_lng,
    end_place_google_place_id,
    end_place_type,
    ctrip_flight_no,
    CAST(remark AS CHAR) as remark,
    CAST(active AS SIGNED) as active,
    CAST(batch AS CHAR) as batch,
    route_type,
    {zone_column} as route_zone_str
    from {crawl_table}
    where {condition}
    order by id asc";

#[derive(Debug, Clone)]
pub struct RouteStore {
    pool: MySqlPool,
    tables: RouteTables,
}

impl RouteStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|err| {
                error!(error = %err, "database connect error; please check database config");
                StoreError::Connect(err)
            })?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            pool,
            tables: RouteTables::default(),
        }
    }

    pub fn with_tables(mut self, tables: RouteTables) -> Self {
        self.tables = tables;
        self
    }

    pub async fn close(&self) {
        self.pool.close().await;
        debug!("mysql pool closed");
    }

    pub async fn fetch_source_routes(&self, selection: &Selection) -> Result<Vec<SourceRoute>, StoreError> {
        if selection.is_empty() {
            return Ok(Vec::new());
        }
        let (criteria, operators) = selection.to_criteria()?;
        let condition = guarded_condition(&criteria, &operators);
        let sql = SOURCE_ROUTE_QUERY
            .replace("{tz_column}", &self.tables.tz_column)
            .replace("{source_table}", &self.tables.source_table)
            .replace("{condition}", &condition.sql);
        let rows = self.fetch_all(&sql, &condition.params).await?;
        rows.iter().map(source_route_from_row).collect()
    }

    pub async fn find_airport(&self, code: &str) -> Result<Option<AirportRecord>, StoreError> {
        let criteria = Criteria::new().with("code3", code);
        let condition = build_condition(&criteria, &Operators::new());
        let sql = format!(
            "select code3, name, google_place_id from airport where {} limit 1",
            condition.sql
        );
        let Some(row) = self.fetch_optional(&sql, &condition.params).await? else {
            return Ok(None);
        };
        Ok(Some(AirportRecord {
            code: column(&row, "code3")?,
            name: column(&row, "name")?,
            google_place_id: column(&row, "google_place_id")?,
        }))
    }

    /// Scheduled flights landing at `to_airport`, in the store's order. With a
    /// window, only schedules whose arrival hour falls inside it qualify.
    pub async fn find_flights(
        &self,
        to_airport: &str,
        window: Option<HourWindow>,
    ) -> Result<Vec<FlightRecord>, StoreError> {
        let criteria = Criteria::new().with("f.to_airport", to_airport);
        let mut condition = build_condition(&criteria, &Operators::new());
        let window_filter = match window {
            Some(window) => {
                condition.params.push(SqlValue::Int(window.start_hour.into()));
                condition.params.push(SqlValue::Int(window.end_hour.into()));
                "and fs.to_hh >= ? and fs.to_hh <= ?"
            }
            None => "",
        };
        let sql = format!(
            "select f.from_airport, f.to_airport, f.code as flight_code,
            CAST(f.flight_number AS CHAR) as flight_number
            from flight f
            left join flight_sch fs on f.flight_sch_id = fs.id
            where {} {} and not f.flight_sch_id is null",
            condition.sql, window_filter
        );
        let rows = self.fetch_all(&sql, &condition.params).await?;
        rows.iter()
            .map(|row| {
                Ok(FlightRecord {
                    from_airport: column::<Option<String>>(row, "from_airport")?.unwrap_or_default(),
                    to_airport: column::<Option<String>>(row, "to_airport")?.unwrap_or_default(),
                    flight_code: column::<Option<String>>(row, "flight_code")?.unwrap_or_default(),
                    flight_number: column::<Option<String>>(row, "flight_number")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    pub async fn last_crawled_id(&self) -> Result<Option<i64>, StoreError> {
        let sql = format!(
            "select CAST(id AS SIGNED) as id from {} order by id desc limit 1",
            self.tables.crawl.table
        );
        match self.fetch_optional(&sql, &[]).await? {
            Some(row) => Ok(Some(column(&row, "id")?)),
            None => Ok(None),
        }
    }

    pub async fn fetch_crawl_routes(&self, ids: &[i64]) -> Result<Vec<TargetRoute>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let criteria = Criteria::new().with("id", ids.to_vec());
        let condition = build_condition(&criteria, &Operators::new());
        let sql = CRAWL_ROUTE_QUERY
            .replace("{zone_column}", &self.tables.zone_column)
            .replace("{crawl_table}", &self.tables.crawl.table)
            .replace("{condition}", &condition.sql);
        let rows = self.fetch_all(&sql, &condition.params).await?;
        rows.iter().map(crawl_route_from_row).collect()
    }

    pub async fn upsert_crawl_route(
        &self,
        route: &TargetRoute,
        coverage: FieldCoverage,
        mode: ExecMode,
    ) -> Result<UpsertOutcome, StoreError> {
        let fields = crawl_route_fields(route, coverage, &self.tables.zone_column);
        let statement = plan_upsert(&self.tables.crawl, &[fields], &[])?;
        self.execute_upsert(&self.tables.crawl, &statement, Some(route.id), mode)
            .await
    }

    /// Runs a planned upsert against `schema`. Whether `key` already exists is
    /// read on the same connection just before the write.
    async fn execute_upsert(
        &self,
        schema: &TableSchema,
        statement: &UpsertStatement,
        key: Option<i64>,
        mode: ExecMode,
    ) -> Result<UpsertOutcome, StoreError> {
        log_statement(&statement.sql, &statement.params);
        let written = match mode {
            ExecMode::Autocommit => {
                let mut conn = self.pool.acquire().await.map_err(StoreError::Connect)?;
                write_upsert(&mut conn, schema, statement, key).await
            }
            ExecMode::Transaction => {
                let mut tx = self.pool.begin().await.map_err(StoreError::Connect)?;
                let written = write_upsert(&mut tx, schema, statement, key).await;
                if written.is_ok() {
                    tx.commit()
                        .await
                        .map_err(|err| statement_failed("commit", &[], err))?;
                }
                written
            }
        };
        written
            .or_else(|err| absorb_duplicate_entry(err, key))
            .map_err(|err| statement_failed(&statement.sql, &statement.params, err))
    }

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<MySqlRow>, StoreError> {
        log_statement(sql, params);
        bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| statement_failed(sql, params, err))
    }

    async fn fetch_optional(&self, sql: &str, params: &[SqlValue]) -> Result<Option<MySqlRow>, StoreError> {
        log_statement(sql, params);
        bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| statement_failed(sql, params, err))
    }
}

async fn write_upsert(
    conn: &mut MySqlConnection,
    schema: &TableSchema,
    statement: &UpsertStatement,
    key: Option<i64>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let existed = match key {
        Some(key) => {
            let exists_sql = format!(
                "select 1 from {} where {} = ? limit 1",
                schema.table, schema.key_column
            );
            sqlx::query(&exists_sql).bind(key).fetch_optional(&mut *conn).await?.is_some()
        }
        None => false,
    };
    let result = bind_params(sqlx::query(&statement.sql), &statement.params)
        .execute(&mut *conn)
        .await?;
    Ok(UpsertOutcome::from_write(
        existed,
        result.rows_affected(),
        result.last_insert_id(),
        key,
    ))
}

fn guarded_condition(criteria: &Criteria, operators: &Operators) -> Condition {
    if criteria.is_empty() {
        Condition {
            sql: "1 = 1".to_string(),
            params: Vec::new(),
        }
    } else {
        build_condition(criteria, operators)
    }
}

fn log_statement(sql: &str, params: &[SqlValue]) {
    debug!(
        statement = %collapse_whitespace(sql),
        params = %display_params(params),
        "executing statement"
    );
}

fn statement_failed(sql: &str, params: &[SqlValue], err: sqlx::Error) -> StoreError {
    error!(
        statement = %collapse_whitespace(sql),
        params = %display_params(params),
        error = %err,
        "sql execution failed"
    );
    StoreError::Statement(err)
}

fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Date(d) => query.bind(*d),
            SqlValue::DateTime(dt) => query.bind(*dt),
        };
    }
    query
}

fn column<'r, T>(row: &'r MySqlRow, name: &'static str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get(name)
        .map_err(|source| StoreError::Decode { column: name, source })
}

fn source_route_from_row(row: &MySqlRow) -> Result<SourceRoute, StoreError> {
    Ok(SourceRoute {
        id: column(row, "spp_route_id")?,
        route_name: column(row, "route_name")?,
        partner_id: column(row, "partner_id")?,
        platform_name: column(row, "platform_name")?,
        service_area_id: column(row, "service_area_id")?,
        from_place: column::<Option<String>>(row, "from_place")?.unwrap_or_default(),
        to_place: column::<Option<String>>(row, "to_place")?.unwrap_or_default(),
        from_address: column(row, "from_address")?,
        to_address: column(row, "to_address")?,
        from_place_lat_lng: column(row, "from_place_lat_lng")?,
        to_place_lat_lng: column(row, "to_place_lat_lng")?,
        route_json: column(row, "route_json")?,
        is_active: column(row, "is_active")?,
        crawl_state: column(row, "crawl_state")?,
        batch: column(row, "batch")?,
        disable_date: column(row, "disable_date")?,
        tz: column(row, "tz")?,
    })
}

fn crawl_route_from_row(row: &MySqlRow) -> Result<TargetRoute, StoreError> {
    let place_type = |name: &'static str| -> Result<Option<PlaceType>, StoreError> {
        Ok(column::<Option<String>>(row, name)?
            .as_deref()
            .and_then(PlaceType::from_db_label))
    };
    Ok(TargetRoute {
        id: column(row, "id")?,
        route_name: column(row, "route_name")?,
        partner_id: column(row, "partner_id")?,
        platform_name: column::<Option<String>>(row, "platform_name")?.unwrap_or_default(),
        service_area_id: column(row, "service_area_id")?,
        disable_date: column(row, "disable_date")?,
        start: EndpointRecord {
            name_manual: column(row, "start_place_name_manual")?,
            lat: column(row, "start_place_lat")?,
            lng: column(row, "start_place_lng")?,
            google_place_id: column(row, "start_place_google_place_id")?,
            place_type: place_type("start_place_type")?,
        },
        end: EndpointRecord {
            name_manual: column(row, "end_place_name_manual")?,
            lat: column(row, "end_place_lat")?,
            lng: column(row, "end_place_lng")?,
            google_place_id: column(row, "end_place_google_place_id")?,
            place_type: place_type("end_place_type")?,
        },
        ctrip_flight_no: column(row, "ctrip_flight_no")?,
        remark: column(row, "remark")?,
        active: column::<Option<i64>>(row, "active")?.unwrap_or_default(),
        batch: column(row, "batch")?,
        route_type: RouteType::from_db_label(column::<Option<String>>(row, "route_type")?.as_deref()),
        route_zone_str: column(row, "route_zone_str")?,
    })
}

/// Field mapping written for one crawl row.
pub fn crawl_route_fields(route: &TargetRoute, coverage: FieldCoverage, zone_column: &str) -> FieldMap {
    let complete = coverage == FieldCoverage::Complete;
    let mut fields = FieldMap::new()
        .with("id", route.id)
        .with("route_name", route.route_name.clone())
        .with("partner_id", route.partner_id)
        .with("platform_name", route.platform_name.clone())
        .with("service_area_id", route.service_area_id)
        .with("disable_date", route.disable_date)
        .with("start_place_name_manual", route.start.name_manual.clone())
        .with("start_place_lat", route.start.lat)
        .with("start_place_lng", route.start.lng);

    let optional = |fields: &mut FieldMap, column: &str, value: SqlValue| {
        if complete || value != SqlValue::Null {
            fields.insert(column, value);
        }
    };
    optional(
        &mut fields,
        "start_place_google_place_id",
        route.start.google_place_id.clone().into(),
    );
    optional(
        &mut fields,
        "start_place_type",
        route.start.place_type.map(PlaceType::db_label).into(),
    );

    fields.insert("end_place_name_manual", route.end.name_manual.clone());
    fields.insert("end_place_lat", route.end.lat);
    fields.insert("end_place_lng", route.end.lng);
    optional(
        &mut fields,
        "end_place_google_place_id",
        route.end.google_place_id.clone().into(),
    );
    optional(
        &mut fields,
        "end_place_type",
        route.end.place_type.map(PlaceType::db_label).into(),
    );
    optional(&mut fields, "ctrip_flight_no", route.ctrip_flight_no.clone().into());
    optional(&mut fields, "remark", route.remark.clone().into());

    fields.insert("active", route.active);
    fields.insert("batch", route.batch.clone());
    fields.insert("route_type", route.route_type.db_label());
    fields.insert(zone_column, route.route_zone_str.clone());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pickup_route() -> TargetRoute {
        TargetRoute {
            id: 3248,
            route_name: Some("LAX to Beverly Hills".into()),
            partner_id: Some(2621),
            platform_name: "ctrip".into(),
            start: EndpointRecord {
                name_manual: Some("LAX".into()),
                google_place_id: Some("ChIJtU-yE9KwwoAR8a2LaVd7qHc".into()),
                place_type: Some(PlaceType::Airport),
                ..Default::default()
            },
            end: EndpointRecord {
                name_manual: Some("Beverly Hills Hotel".into()),
                place_type: Some(PlaceType::Hotel),
                ..Default::default()
            },
            ctrip_flight_no: Some("AA100".into()),
            remark: Some("{}".into()),
            active: 1,
            route_type: RouteType::Pickup,
            ..Default::default()
        }
    }

    #[test]
    fn derived_coverage_skips_unset_optionals() {
        let mut route = pickup_route();
        route.end.google_place_id = None;
        let fields = crawl_route_fields(&route, FieldCoverage::Derived, "route_zone_str");
        assert!(!fields.contains("end_place_google_place_id"));
        assert_eq!(fields.get("start_place_type"), Some(&SqlValue::from("机场")));
        assert_eq!(fields.get("end_place_type"), Some(&SqlValue::from("酒店")));
        assert_eq!(fields.get("route_type"), Some(&SqlValue::from("接机")));
        assert_eq!(fields.get("start_place_lat"), Some(&SqlValue::Null));
    }

    #[test]
    fn complete_coverage_writes_every_column() {
        let fields = crawl_route_fields(&TargetRoute::default(), FieldCoverage::Complete, "route_zone_str");
        let columns: Vec<&str> = fields.columns().collect();
        assert_eq!(columns, crate::upsert::CRAWL_ROUTE_COLUMNS.to_vec());
        assert_eq!(fields.get("route_type"), Some(&SqlValue::Null));
    }

    #[test]
    fn unclassified_route_has_no_remark_column() {
        let route = TargetRoute {
            id: 5,
            ..Default::default()
        };
        let fields = crawl_route_fields(&route, FieldCoverage::Derived, "route_zone_str");
        assert!(!fields.contains("remark"));
        assert!(!fields.contains("ctrip_flight_no"));
        assert!(fields.contains("route_type"));
    }

    #[test]
    fn crawl_upsert_plan_covers_allow_list() {
        let fields = crawl_route_fields(&pickup_route(), FieldCoverage::Derived, "route_zone_str");
        let stmt = plan_upsert(&TableSchema::crawl_route(), &[fields], &[]).unwrap();
        assert!(stmt.sql.starts_with("insert into spp_crawl_route(id,route_name,"));
        assert!(!stmt.update_columns.iter().any(|c| c == "id"));
        assert!(stmt.update_columns.iter().any(|c| c == "ctrip_flight_no"));
    }

    #[test]
    fn purchasing_upsert_keeps_place_columns_out_of_the_update() {
        let mut route = pickup_route();
        route.route_zone_str = Some("America/Los_Angeles".into());
        let tables = crate::RouteTables::purchasing();
        let fields = crawl_route_fields(&route, FieldCoverage::Derived, &tables.zone_column);
        assert!(fields.contains("route_zone_str2"));
        assert!(!fields.contains("route_zone_str"));

        let stmt = plan_upsert(&tables.crawl, &[fields], &[]).unwrap();
        assert!(stmt.sql.starts_with("insert into spp_crawl_route_purchasing(id,"));
        assert!(stmt.update_columns.iter().any(|c| c == "route_zone_str2"));
        assert!(!stmt.update_columns.iter().any(|c| c == "start_place_google_place_id"));
        assert!(!stmt.update_columns.iter().any(|c| c == "end_place_type"));
    }

    #[test]
    fn fresh_key_is_an_insert() {
        assert_eq!(
            UpsertOutcome::from_write(false, 1, 0, Some(42)),
            UpsertOutcome::Inserted { id: 42 }
        );
        assert_eq!(
            UpsertOutcome::from_write(false, 1, 77, Some(42)),
            UpsertOutcome::Inserted { id: 77 }
        );
    }

    #[test]
    fn unchanged_rerun_under_found_rows_is_a_noop() {
        // CLIENT_FOUND_ROWS: a matched row with identical values still counts 1.
        assert_eq!(UpsertOutcome::from_write(true, 1, 0, Some(3248)), UpsertOutcome::NoOp);
        assert_eq!(UpsertOutcome::from_write(true, 0, 0, Some(3248)), UpsertOutcome::NoOp);
        assert_eq!(UpsertOutcome::from_write(true, 2, 0, Some(3248)), UpsertOutcome::Updated);
    }

    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
    }

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Duplicate entry 'LAX-2621' for key 'uniq_route'")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "Duplicate entry 'LAX-2621' for key 'uniq_route'"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }
    }

    #[test]
    fn duplicate_entry_is_absorbed_as_noop() {
        let err = sqlx::Error::Database(Box::new(FakeDbError { unique: true }));
        assert_eq!(absorb_duplicate_entry(err, Some(3248)).unwrap(), UpsertOutcome::NoOp);
    }

    #[test]
    fn other_failures_are_not_absorbed() {
        let err = sqlx::Error::Database(Box::new(FakeDbError { unique: false }));
        assert!(matches!(absorb_duplicate_entry(err, Some(3248)), Err(sqlx::Error::Database(_))));
        assert!(matches!(
            absorb_duplicate_entry(sqlx::Error::RowNotFound, None),
            Err(sqlx::Error::RowNotFound)
        ));
    }

    #[test]
    fn empty_criteria_are_guarded() {
        let cond = guarded_condition(&Criteria::new(), &Operators::new());
        assert_eq!(cond.sql, "1 = 1");
        assert!(cond.params.is_empty());
    }

    #[test]
    fn whitespace_is_collapsed_for_logs() {
        assert_eq!(collapse_whitespace("select id\n    from t\twhere x=?"), "select id from t where x=?");
    }
}

//! Schema maintenance and inspection
//!
//! Direct table sampling over REST, the function-side debug dump, schema
//! cache reloads, the foreign key migration, and the alternate function
//! deployments. Reload and migration write to the remote database.

use serde_json::{json, Value};

use super::{call, expect_success, Outcome, ProbeContext, Suite};
use crate::actions::{MaintenanceAction, RoomsAction};
use crate::client::{ProbeResponse, RemoteFunction};
use crate::diagnosis::{FOREIGN_KEY_NAME, RELOAD_SCHEMA_SQL};
use crate::report::{CheckResult, ExitPolicy, SuiteReport};

pub(crate) const AFTER_RELOAD: &str = "pending_invitations_after_reload";
pub(crate) const AFTER_FIX: &str = "pending_invitations_after_fix";

/// Statements that ask PostgREST to rebuild its schema cache
pub const CACHE_RELOAD_STATEMENTS: [&str; 3] = [
    RELOAD_SCHEMA_SQL,
    "NOTIFY ddl_command_end;",
    "SELECT pg_notify('pgrst', 'reload schema');",
];

/// Migration adding `join_requests.room_id` and its foreign key
pub const FOREIGN_KEY_MIGRATION: [&str; 4] = [
    "ALTER TABLE public.join_requests ADD COLUMN IF NOT EXISTS room_id UUID;",
    "ALTER TABLE public.join_requests ADD CONSTRAINT IF NOT EXISTS join_requests_room_id_fkey \
     FOREIGN KEY (room_id) REFERENCES public.game_rooms(id) ON DELETE CASCADE;",
    "CREATE INDEX IF NOT EXISTS idx_join_requests_room_id ON public.join_requests(room_id);",
    "UPDATE public.join_requests SET room_id = (SELECT gr.id FROM public.game_rooms gr \
     WHERE gr.room_code = join_requests.room_code) WHERE room_id IS NULL;",
];

// ============================================
// tables
// ============================================

pub(super) async fn tables(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Tables;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::Informational);

    report.push(sample_table(ctx, "join_requests", Some("room_id")).await);
    report.push(sample_table(ctx, "game_rooms", None).await);

    report
}

async fn sample_table(ctx: &ProbeContext, table: &str, required_column: Option<&str>) -> CheckResult {
    let mut check = CheckResult::new(format!("{}_sample", table));

    let resp = match ctx.client.select_sample(table).await {
        Ok(resp) => resp,
        Err(e) => {
            check.fail(format!("{} sample exception: {}", table, e));
            return check;
        }
    };
    if !resp.is_success_status() {
        check.fail(format!("{} sample HTTP error: {}", table, resp.status));
        return check;
    }

    let rows = match resp.json() {
        Some(Value::Array(rows)) => rows,
        _ => {
            check.fail(format!("{} sample returned malformed response", table));
            return check;
        }
    };

    let Some(row) = rows.first() else {
        check.pass();
        check.note(format!("No records in {} table", table));
        return check;
    };

    check.note(format!(
        "Sample {} record: {}",
        table,
        serde_json::to_string_pretty(row).unwrap_or_else(|_| row.to_string())
    ));

    match required_column {
        Some(column) if row.get(column).is_none() => {
            check.fail(format!("{} column MISSING from {} table", column, table));
        }
        Some(column) => {
            check.pass();
            check.note(format!("{} column EXISTS in {} table", column, table));
        }
        None => check.pass(),
    }
    check
}

// ============================================
// debug-schema
// ============================================

pub(super) async fn debug_schema(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::DebugSchema;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::Informational);

    let mut check = CheckResult::new("debug_schema");
    if let Some(env) = expect_success(
        ctx,
        &mut check,
        "Debug",
        RemoteFunction::ManageGameRooms,
        &RoomsAction::DebugSchema,
    )
    .await
    {
        for (label, key) in [
            ("Table structure", "table_structure"),
            ("Table error", "table_error"),
            ("Basic query result", "basic_query"),
            ("Basic query error", "basic_query_error"),
        ] {
            check.note(format!("{}: {}", label, render(env.debug_info(key))));
        }
    }
    report.push(check);

    report
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ============================================
// reload-schema
// ============================================

pub(super) async fn reload_schema(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::ReloadSchema;
    let mut report = SuiteReport::new(
        suite.name(),
        suite.title(),
        ExitPolicy::Required(vec![AFTER_RELOAD.to_string()]),
    );

    let mut action = CheckResult::new("reload_schema_cache_action");
    if let Some(env) = expect_success(
        ctx,
        &mut action,
        "Reload schema cache",
        RemoteFunction::ManageGameRooms,
        &RoomsAction::ReloadSchemaCache,
    )
    .await
    {
        if let Some(message) = env.message() {
            action.note(message);
        }
    }
    report.push(action);

    let notify = ctx.client.rpc("notify_reload_schema", &json!({})).await;
    report.push(rest_check("notify_reload_schema_rpc", "notify_reload_schema RPC", notify));

    for (i, statement) in CACHE_RELOAD_STATEMENTS.iter().enumerate() {
        let resp = ctx.client.rpc("exec_sql", &json!({ "sql": statement })).await;
        let mut check = rest_check(
            &format!("exec_sql_method_{}", i + 1),
            &format!("Method {}", i + 1),
            resp,
        );
        check.note(statement.to_string());
        report.push(check);
    }

    report.push(invitations_recheck(ctx, AFTER_RELOAD).await);

    report
}

// ============================================
// fix-schema
// ============================================

pub(super) async fn fix_schema(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::FixSchema;
    let mut report = SuiteReport::new(
        suite.name(),
        suite.title(),
        ExitPolicy::Required(vec![AFTER_FIX.to_string()]),
    );

    let mut function = CheckResult::new("fix_schema_function");
    if expect_success(
        ctx,
        &mut function,
        "Schema fix",
        RemoteFunction::FixSchema,
        &MaintenanceAction::FixSchema,
    )
    .await
    .is_some()
    {
        function.note("Schema fix executed successfully");
    }
    report.push(function);

    for (i, statement) in FOREIGN_KEY_MIGRATION.iter().enumerate() {
        report.push(migration_step(ctx, i + 1, statement).await);
    }

    let recheck = invitations_recheck(ctx, AFTER_FIX).await;
    if !recheck.passed() {
        report.finding(format!(
            "The '{}' constraint is still not visible to the functions",
            FOREIGN_KEY_NAME
        ));
        report.finding(format!(
            "Apply the migration in the SQL editor, then run {}",
            RELOAD_SCHEMA_SQL
        ));
    }
    report.push(recheck);

    report
}

/// Run one statement through `exec_sql`, falling back to `rest/v1/query`
async fn migration_step(ctx: &ProbeContext, step: usize, statement: &str) -> CheckResult {
    let mut check = CheckResult::new(format!("migration_step_{}", step));
    check.note(statement.to_string());

    let primary = ctx.client.rpc("exec_sql", &json!({ "sql": statement })).await;
    let primary_status = match primary {
        Ok(resp) if accepted(&resp) => {
            check.pass();
            check.note(format!("Applied via exec_sql ({})", resp.status));
            return check;
        }
        Ok(resp) => resp.status.to_string(),
        Err(e) => e.to_string(),
    };

    let fallback = ctx.client.rest_post("query", &json!({ "query": statement })).await;
    match fallback {
        Ok(resp) if accepted(&resp) => {
            check.pass();
            check.note(format!(
                "exec_sql rejected ({}), applied via query endpoint ({})",
                primary_status, resp.status
            ));
        }
        Ok(resp) => check.fail(format!(
            "Failed to apply SQL command {}: exec_sql {}, query endpoint {}",
            step, primary_status, resp.status
        )),
        Err(e) => check.fail(format!(
            "Failed to apply SQL command {}: exec_sql {}, query endpoint exception: {}",
            step, primary_status, e
        )),
    }
    check
}

fn accepted(resp: &ProbeResponse) -> bool {
    matches!(resp.status, 200 | 201 | 204)
}

// ============================================
// variants
// ============================================

pub(super) async fn variants(ctx: &ProbeContext) -> SuiteReport {
    let suite = Suite::Variants;
    let mut report = SuiteReport::new(suite.name(), suite.title(), ExitPolicy::Informational);

    let mut clean = CheckResult::new("clean_function_invitations");
    if expect_success(
        ctx,
        &mut clean,
        "Clean function",
        RemoteFunction::ManageGameRoomsClean,
        &RoomsAction::pending_invitations(ctx.fixtures.watched.clone()),
    )
    .await
    .is_some()
    {
        clean.note("Clean function working, no schema cache issues");
    }
    report.push(clean);

    let mut simple = CheckResult::new("service_role_query");
    if let Some(env) = expect_success(
        ctx,
        &mut simple,
        "Service role query",
        RemoteFunction::TestSimple,
        &MaintenanceAction::TestDirectQuery {
            child_id: "test".to_string(),
        },
    )
    .await
    {
        simple.note(format!(
            "Service role access working, found {} records",
            env.data_items().len()
        ));
    }
    report.push(simple);

    report
}

// ============================================
// shared
// ============================================

fn rest_check(
    name: &str,
    label: &str,
    resp: crate::error::Result<ProbeResponse>,
) -> CheckResult {
    let mut check = CheckResult::new(name);
    match resp {
        Ok(resp) if resp.is_success_status() => check.pass(),
        Ok(resp) => {
            check.fail(format!("{} HTTP error: {}", label, resp.status));
            if !resp.body.is_empty() {
                check.note(resp.body);
            }
        }
        Err(e) => check.fail(format!("{} exception: {}", label, e)),
    }
    check
}

/// Poll pending invitations for the host and diagnose any failure
async fn invitations_recheck(ctx: &ProbeContext, name: &str) -> CheckResult {
    let mut check = CheckResult::new(name);
    let outcome = call(
        ctx,
        RemoteFunction::ManageGameRooms,
        &RoomsAction::pending_invitations(ctx.fixtures.host.clone()),
    )
    .await;

    if !matches!(outcome, Outcome::Success(_)) {
        if let Some(diagnosis) = outcome.diagnosis() {
            check.diagnose(diagnosis);
        }
    }
    if let Some(env) = outcome.record(&mut check, "get_pending_invitations") {
        let invitations = env.data_items();
        check.note(format!("Found {} pending invitations", invitations.len()));
        for inv in invitations {
            check.note(format!("  - {}", inv));
        }
    }
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::Diagnosis;
    use crate::testing::{MockBackend, Reply, TEST_KEY};

    #[tokio::test]
    async fn test_tables_detects_missing_column() {
        let backend = MockBackend::start(|req| match req.path.as_str() {
            "/rest/v1/join_requests" => Reply::ok(json!([{"id": "jr-1", "room_code": "AB12CD"}])),
            _ => Reply::ok(json!([])),
        })
        .await;

        let report = tables(&backend.context()).await;
        assert_eq!(
            report.errors(),
            vec!["room_id column MISSING from join_requests table"]
        );
        assert!(report.is_passed("game_rooms_sample"));
        assert_eq!(
            report.check("game_rooms_sample").unwrap().notes,
            vec!["No records in game_rooms table"]
        );

        let requests = backend.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].query.as_deref(), Some("limit=1"));
        assert_eq!(requests[0].apikey.as_deref(), Some(TEST_KEY));
        assert_eq!(
            requests[0].authorization,
            Some(format!("Bearer {}", TEST_KEY))
        );
    }

    #[tokio::test]
    async fn test_debug_schema_notes() {
        let backend = MockBackend::start(|_| {
            Reply::ok(json!({
                "success": true,
                "debug_info": {
                    "table_structure": "id, room_code, status",
                    "table_error": null,
                    "basic_query": [{"id": 1}]
                }
            }))
        })
        .await;

        let report = debug_schema(&backend.context()).await;
        assert_eq!(
            report.check("debug_schema").unwrap().notes,
            vec![
                "Table structure: id, room_code, status",
                "Table error: None",
                "Basic query result: [{\"id\":1}]",
                "Basic query error: None"
            ]
        );
        assert_eq!(backend.actions(), vec!["debug_schema"]);
    }

    #[tokio::test]
    async fn test_reload_schema_sequence() {
        let backend = MockBackend::start(|req| match req.path.as_str() {
            "/rest/v1/rpc/notify_reload_schema" => Reply::status(404, json!({"message": "function not found"})),
            "/rest/v1/rpc/exec_sql" => Reply::status(404, json!({"message": "function not found"})),
            _ => match req.action() {
                Some("reload_schema_cache") => Reply::ok(json!({
                    "success": true,
                    "message": "Schema cache reload notification sent successfully"
                })),
                _ => Reply::ok(json!({"success": true, "data": []})),
            },
        })
        .await;

        let report = reload_schema(&backend.context()).await;
        assert_eq!(report.total(), 6);
        assert!(report.is_passed("reload_schema_cache_action"));
        assert!(!report.is_passed("exec_sql_method_1"));
        assert!(report.is_passed(AFTER_RELOAD));
        assert_eq!(report.exit_code(), 0);

        let sql: Vec<_> = backend
            .requests()
            .iter()
            .filter(|r| r.path == "/rest/v1/rpc/exec_sql")
            .map(|r| r.str_field("sql").unwrap().to_string())
            .collect();
        assert_eq!(sql, CACHE_RELOAD_STATEMENTS.to_vec());

        let recheck = backend
            .requests()
            .into_iter()
            .find(|r| r.action() == Some("get_pending_invitations"))
            .unwrap();
        assert_eq!(
            recheck.str_field("child_id"),
            Some(crate::config::Fixtures::default().host.as_str())
        );
    }

    #[tokio::test]
    async fn test_reload_schema_still_stale() {
        let backend = MockBackend::start(|req| match req.action() {
            Some("get_pending_invitations") => Reply::status(
                400,
                json!({"success": false, "error": "Could not find the table in the schema cache"}),
            ),
            _ => Reply::ok(json!({"success": true})),
        })
        .await;

        let report = reload_schema(&backend.context()).await;
        let after = report.check(AFTER_RELOAD).unwrap();
        assert_eq!(after.diagnosis, Some(Diagnosis::SchemaCache));
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_fix_schema_falls_back_to_query_endpoint() {
        let backend = MockBackend::start(|req| match req.path.as_str() {
            "/rest/v1/rpc/exec_sql" => Reply::status(404, json!({"message": "not found"})),
            "/rest/v1/query" => Reply::status(201, json!({})),
            "/functions/v1/fix-schema" => Reply::ok(json!({"success": false, "error": "Schema fix failed: permission denied"})),
            _ => Reply::ok(json!({"success": true, "data": []})),
        })
        .await;

        let report = fix_schema(&backend.context()).await;
        assert_eq!(
            report.check("fix_schema_function").unwrap().errors,
            vec!["Schema fix failed: Schema fix failed: permission denied"]
        );
        for step in 1..=4 {
            assert!(report.is_passed(&format!("migration_step_{}", step)));
        }
        assert!(report.is_passed(AFTER_FIX));
        assert!(report.findings.is_empty());

        let queries: Vec<_> = backend
            .requests()
            .iter()
            .filter(|r| r.path == "/rest/v1/query")
            .map(|r| r.str_field("query").unwrap().to_string())
            .collect();
        assert_eq!(queries, FOREIGN_KEY_MIGRATION.to_vec());
    }

    #[tokio::test]
    async fn test_variants() {
        let backend = MockBackend::start(|req| match req.function() {
            Some("manage-game-rooms-clean") => Reply::ok(json!({"success": true, "data": []})),
            _ => Reply::ok(json!({"success": true, "data": [{"id": 1}, {"id": 2}]})),
        })
        .await;

        let report = variants(&backend.context()).await;
        assert_eq!(report.passed(), 2);
        assert_eq!(
            report.check("service_role_query").unwrap().notes,
            vec!["Service role access working, found 2 records"]
        );
        let requests = backend.requests();
        assert_eq!(requests[1].action(), Some("test_direct_query"));
        assert_eq!(requests[1].str_field("child_id"), Some("test"));
    }
}

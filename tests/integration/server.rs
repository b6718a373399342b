/// JSON-RPC handling of the MCP server, driven line by line
use chrono::NaiveDate;
use serde_json::{json, Value};
use time_planner_mcp::mcp::protocol::error_codes;
use time_planner_mcp::mcp::McpServer;
use time_planner_mcp::*;

fn server() -> McpServer<FixedClock> {
    let clock = FixedClock::at(NaiveDate::from_ymd_opt(2025, 7, 16).unwrap(), 9, 0);
    let store: Box<dyn SnapshotStore> = Box::new(MemoryStore::new());
    let service = TimeManagementService::open(store, clock, NaiveDate::from_ymd_opt(2025, 7, 1));
    McpServer::new(TimePlannerServer::from_parts(service, UserPreferences::default()))
}

async fn call(server: &mut McpServer<FixedClock>, id: u64, method: &str, params: Value) -> Value {
    let line = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string();
    let response = server.process_line(&line).await.expect("request should get a response");
    serde_json::to_value(response).unwrap()
}

/// Call a tool and return (is_error, text)
async fn call_tool(server: &mut McpServer<FixedClock>, name: &str, arguments: Value) -> (bool, String) {
    let response = call(server, 7, "tools/call", json!({ "name": name, "arguments": arguments })).await;
    let result = &response["result"];
    (
        result["isError"].as_bool().unwrap(),
        result["content"][0]["text"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let mut server = server();

    let init = call(&mut server, 1, "initialize", json!({})).await;
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "Time Planner MCP");

    let notification = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string();
    assert!(server.process_line(&notification).await.is_none());
    assert!(server.is_initialized());

    let list = call(&mut server, 2, "tools/list", json!({})).await;
    let tools = list["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 17);
    let add = tools.iter().find(|t| t["name"] == "add_daily_task").unwrap();
    let required: Vec<_> = add["inputSchema"]["required"].as_array().unwrap().iter().collect();
    assert!(required.contains(&&json!("start_time")));
}

#[tokio::test]
async fn test_daily_task_tools_report_conflicts() {
    let mut server = server();

    let (is_error, text) = call_tool(
        &mut server,
        "add_daily_task",
        json!({ "name": "Team sync", "date": "today", "start_time": "14:00", "end_time": "15:00", "can_reschedule": false }),
    )
    .await;
    assert!(!is_error, "{}", text);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["task"]["start_time"], "14:00");

    let (is_error, text) = call_tool(
        &mut server,
        "add_daily_task",
        json!({ "name": "Code review", "date": "2025-07-16", "start_time": "14:30", "end_time": "15:30" }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("Team sync"));

    let (is_error, text) = call_tool(&mut server, "get_daily_schedule", json!({})).await;
    assert!(!is_error);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["schedule"]["tasks"].as_array().unwrap().len(), 1);

    assert_eq!(server.planner().service().snapshot().daily_task_count(), 1);
}

#[tokio::test]
async fn test_weekly_and_time_tools() {
    let mut server = server();

    let (is_error, _) = call_tool(
        &mut server,
        "add_weekly_task",
        json!({ "name": "Plan sprint", "week": "current", "priority": "high" }),
    )
    .await;
    assert!(!is_error);

    let (_, text) = call_tool(&mut server, "get_weekly_schedule", json!({ "week": 3 })).await;
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["schedule"]["tasks"][0]["name"], "Plan sprint");

    let (_, text) = call_tool(&mut server, "parse_relative_date", json!({ "term": "tomorrow" })).await;
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["date"], "2025-07-17");

    let (_, text) = call_tool(&mut server, "get_statistics", json!({})).await;
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["statistics"]["total_weekly_tasks"], 1);
    assert_eq!(body["statistics"]["current_week"], 3);
}

#[tokio::test]
async fn test_plan_day_tool() {
    let mut server = server();
    let (is_error, text) = call_tool(
        &mut server,
        "plan_day",
        json!({ "tasks": [{ "name": "Write report", "duration_minutes": 90, "priority": "urgent" }], "commit": true }),
    )
    .await;
    assert!(!is_error, "{}", text);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["placed"][0], "Write report");
    assert_eq!(server.planner().service().snapshot().daily_task_count(), 1);
}

#[tokio::test]
async fn test_protocol_errors() {
    let mut server = server();

    let response = server.process_line("{ this is not json").await.unwrap();
    let value = serde_json::to_value(response).unwrap();
    assert_eq!(value["error"]["code"], error_codes::PARSE_ERROR);

    let value = call(&mut server, 3, "resources/list", json!({})).await;
    assert_eq!(value["error"]["code"], error_codes::METHOD_NOT_FOUND);

    let (is_error, text) = call_tool(&mut server, "delete_everything", json!({})).await;
    assert!(is_error);
    assert!(text.contains("Unknown tool"));

    let (is_error, text) = call_tool(&mut server, "add_daily_task", json!({ "name": "Incomplete" })).await;
    assert!(is_error);
    assert!(text.contains("Invalid arguments"));

    let old = json!({ "jsonrpc": "1.0", "id": 9, "method": "ping" }).to_string();
    let value = serde_json::to_value(server.process_line(&old).await.unwrap()).unwrap();
    assert_eq!(value["error"]["code"], error_codes::INVALID_REQUEST);

    let ping = call(&mut server, 10, "ping", json!({})).await;
    assert_eq!(ping["id"], 10);
    assert!(ping.get("error").is_none());

    assert!(server.process_line("   ").await.is_none());
}

#[tokio::test]
async fn test_out_of_range_numbers_are_tool_errors() {
    let mut server = server();

    let calls = [
        ("add_weekly_task", json!({ "name": "Someday", "week": 100_000_000 })),
        ("get_weekly_schedule", json!({ "week": 4_000_000_000u64 })),
        ("get_weekly_schedule", json!({ "week": "99999999" })),
        ("find_free_time_slots", json!({ "duration_minutes": i64::MAX })),
        ("find_free_time_slots", json!({ "duration_minutes": 0 })),
        ("plan_day", json!({ "tasks": [{ "name": "Forever", "duration_minutes": i64::MAX }] })),
    ];
    for (tool, arguments) in calls {
        let (is_error, text) = call_tool(&mut server, tool, arguments.clone()).await;
        assert!(is_error, "{} {} should fail, got {}", tool, arguments, text);
    }

    // Still serving, and nothing was stored
    let ping = call(&mut server, 11, "ping", json!({})).await;
    assert_eq!(ping["id"], 11);
    let (is_error, _) = call_tool(&mut server, "get_weekly_schedule", json!({ "week": 3 })).await;
    assert!(!is_error);
    assert_eq!(server.planner().service().snapshot().weekly_task_count(), 0);
}

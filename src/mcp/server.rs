/// Line-oriented MCP server over stdin/stdout
///
/// Each input line is one JSON-RPC message and each request gets exactly one
/// output line. Tool calls are dispatched to the handlers in `tools`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::domain::Clock;
use crate::mcp::protocol::*;
use crate::service::ServiceError;
use crate::tools;
use crate::{ServerError, TimePlannerServer};

/// MCP server wrapping a `TimePlannerServer`
pub struct McpServer<C: Clock> {
    planner: TimePlannerServer<C>,
    initialized: bool,
}

impl<C: Clock> McpServer<C> {
    pub fn new(planner: TimePlannerServer<C>) -> Self {
        Self {
            planner,
            initialized: false,
        }
    }

    pub fn planner(&self) -> &TimePlannerServer<C> {
        &self.planner
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Serve requests until stdin is closed
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Waiting for JSON-RPC requests on stdin");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.process_line(&line).await else {
                continue;
            };

            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            stdout.write_all(&encoded).await?;
            stdout.flush().await?;
            debug!("Sent response for id {}", response.id);
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Blank lines and notifications produce no response.
    pub async fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                ));
            }
        };

        self.handle_request(request)
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            warn!("Rejected request with jsonrpc '{}'", request.jsonrpc);
            return Some(JsonRpcResponse::failure(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version '{}'", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => {
                info!("MCP client connected");
                JsonRpcResponse::from_serializable(id, InitializeResult::new("Time Planner MCP"))
            }
            "initialized" => {
                self.initialized = true;
                JsonRpcResponse::success(id, json!({}))
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params),
            other => JsonRpcResponse::failure(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", other),
            ),
        };
        Some(response)
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                info!("MCP client initialized");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let call: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(call)) => call,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(id, error_codes::INVALID_PARAMS, format!("Invalid parameters: {}", e));
            }
            None => return JsonRpcResponse::failure(id, error_codes::INVALID_PARAMS, "Missing parameters"),
        };

        debug!("Calling tool '{}'", call.name);
        let result = self.call_tool(&call.name, call.arguments);
        JsonRpcResponse::from_serializable(id, result)
    }

    fn call_tool(&mut self, name: &str, args: Map<String, Value>) -> ToolCallResult {
        let planner = &mut self.planner;
        match name {
            "add_daily_task" => run(args, |p| tools::add_daily_task(planner.service_mut(), p)),
            "update_daily_task" => run(args, |p| tools::update_daily_task(planner.service_mut(), p)),
            "remove_daily_task" => run(args, |p| tools::remove_daily_task(planner.service_mut(), p)),
            "get_daily_schedule" => run(args, |p| tools::get_daily_schedule(planner.service(), p)),
            "get_date_range_schedules" => run(args, |p| tools::get_date_range_schedules(planner.service(), p)),
            "add_weekly_task" => run(args, |p| tools::add_weekly_task(planner.service_mut(), p)),
            "update_weekly_task" => run(args, |p| tools::update_weekly_task(planner.service_mut(), p)),
            "remove_weekly_task" => run(args, |p| tools::remove_weekly_task(planner.service_mut(), p)),
            "get_weekly_schedule" => run(args, |p| tools::get_weekly_schedule(planner.service(), p)),
            "find_free_time_slots" => run(args, |p| tools::find_free_time_slots(planner.service(), p)),
            "detect_conflicts" => run(args, |p| tools::detect_conflicts(planner.service(), p)),
            "get_statistics" => run(args, |p| tools::get_statistics(planner.service(), p)),
            "get_current_time" => run(args, |p| Ok(tools::get_current_time(planner.service().clock(), p))),
            "get_time_until_next_period" => {
                run(args, |p| Ok(tools::get_time_until_next_period(planner.service().clock(), p)))
            }
            "get_week_progress" => run(args, |p| Ok(tools::get_week_progress(planner.service().clock(), p))),
            "parse_relative_date" => run(args, |p| {
                tools::parse_relative_date(planner.service().clock(), p).map_err(ServiceError::from)
            }),
            "plan_day" => run(args, |p| {
                let (service, planning, preferences) = planner.parts_mut();
                tools::plan_day(service, planning, preferences, p)
            }),
            _ => {
                warn!("Unknown tool requested: {}", name);
                ToolCallResult::failure(format!("Unknown tool: {}", name))
            }
        }
    }
}

/// Deserialize the arguments, run the tool and render its response
fn run<P, R>(args: Map<String, Value>, tool: impl FnOnce(P) -> Result<R, ServiceError>) -> ToolCallResult
where
    P: DeserializeOwned,
    R: Serialize,
{
    let params: P = match serde_json::from_value(Value::Object(args)) {
        Ok(params) => params,
        Err(e) => return ToolCallResult::failure(format!("Invalid arguments: {}", e)),
    };

    match tool(params) {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => ToolCallResult::failure(e),
        },
        Err(e) => {
            warn!("Tool failed ({}): {}", service_error_kind(&e), e);
            ToolCallResult::failure(e)
        }
    }
}

/// Every tool this server offers, with generated input schemas
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::of::<tools::AddDailyTaskParams>(
            "add_daily_task",
            "Add a task with start and end times to a specific day. Rejected if it overlaps a non-parallel task.",
        ),
        ToolDefinition::of::<tools::UpdateDailyTaskParams>(
            "update_daily_task",
            "Change the name, date, times or flags of a daily task, found by id or by name and date",
        ),
        ToolDefinition::of::<tools::RemoveDailyTaskParams>(
            "remove_daily_task",
            "Remove a daily task, found by id or by name and date",
        ),
        ToolDefinition::of::<tools::GetDailyScheduleParams>(
            "get_daily_schedule",
            "List the tasks of one day in start-time order",
        ),
        ToolDefinition::of::<tools::GetDateRangeSchedulesParams>(
            "get_date_range_schedules",
            "List every day with tasks between two dates, inclusive",
        ),
        ToolDefinition::of::<tools::AddWeeklyTaskParams>(
            "add_weekly_task",
            "Add a task to a week (number or 'current') with a priority of critical, high, medium or low",
        ),
        ToolDefinition::of::<tools::UpdateWeeklyTaskParams>(
            "update_weekly_task",
            "Change the name, week, description or priority of a weekly task",
        ),
        ToolDefinition::of::<tools::RemoveWeeklyTaskParams>(
            "remove_weekly_task",
            "Remove a weekly task, found by id or by name and week",
        ),
        ToolDefinition::of::<tools::GetWeeklyScheduleParams>(
            "get_weekly_schedule",
            "List a week's tasks ordered by priority",
        ),
        ToolDefinition::of::<tools::FindFreeTimeSlotsParams>(
            "find_free_time_slots",
            "Find gaps of at least the requested length on a day within a preferred window",
        ),
        ToolDefinition::of::<tools::DetectConflictsParams>(
            "detect_conflicts",
            "List pairs of overlapping tasks on a day",
        ),
        ToolDefinition::of::<tools::GetStatisticsParams>(
            "get_statistics",
            "Summarise stored days, weeks and tasks",
        ),
        ToolDefinition::of::<tools::GetCurrentTimeParams>(
            "get_current_time",
            "Current date, time and weekday of the server",
        ),
        ToolDefinition::of::<tools::GetTimeUntilNextPeriodParams>(
            "get_time_until_next_period",
            "Time left until the next part of the day (morning, noon, evening, night)",
        ),
        ToolDefinition::of::<tools::GetWeekProgressParams>(
            "get_week_progress",
            "How far through the current Monday-to-Sunday week we are",
        ),
        ToolDefinition::of::<tools::ParseRelativeDateParams>(
            "parse_relative_date",
            "Turn 'today', 'tomorrow' and similar terms into a YYYY-MM-DD date",
        ),
        ToolDefinition::of::<tools::PlanDayParams>(
            "plan_day",
            "Fit a list of tasks into a day around existing tasks and meals, highest priority first",
        ),
    ]
}

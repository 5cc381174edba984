use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manufacturer {
    pub manufacturer_id: u32,
    pub name: String,
    pub full_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Machine {
    pub opdb_id: String,
    pub is_machine: bool,
    pub name: String,
    pub shortname: String,
    pub ipdb_id: Option<u32>,
    pub manufacture_date: String,
    pub manufacturer: Manufacturer,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub display: String,
    pub player_count: u32,
    pub aliases: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineGroup {
    pub opdb_id: String,
    pub name: String,
    pub shortname: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub changelog_id: u32,
    pub opdb_id_deleted: String,
    pub action: String,
    pub opdb_id_replacement: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeaheadEntry {
    pub id: String,
    pub text: String,
    pub name: String,
}

/// One request as the server saw it: concrete path, decoded query
/// parameters, and the two headers clients are expected to send.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub accept: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    api_token: String,
    machines: Arc<Vec<Machine>>,
    groups: Arc<Vec<MachineGroup>>,
    changelog: Arc<Vec<ChangelogEntry>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl AppState {
    /// Fresh state over the fixture catalog, accepting only `api_token` on
    /// the authenticated routes.
    pub fn new(api_token: &str) -> Self {
        Self {
            api_token: api_token.to_string(),
            machines: Arc::new(fixture_machines()),
            groups: Arc::new(fixture_groups()),
            changelog: Arc::new(fixture_changelog()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn groups(&self) -> &[MachineGroup] {
        &self.groups
    }

    pub fn changelog(&self) -> &[ChangelogEntry] {
        &self.changelog
    }

    /// Every request the server has seen, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded().clone()
    }

    pub fn request_count(&self) -> usize {
        self.recorded().len()
    }

    fn record(&self, path: &str, params: &BTreeMap<String, String>, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        self.recorded().push(RecordedRequest {
            path: path.to_string(),
            query: params.clone(),
            accept: header("accept"),
            user_agent: header("user-agent"),
        });
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        // The recorder holds no invariants worth abandoning on a poisoned
        // lock, so recover the inner value.
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/changelog", get(changelog))
        .route("/search/typeahead", get(typeahead_search))
        .route("/search", get(search_machines))
        .route("/machines/{opdb_id}", get(machine_by_opdb_id))
        .route("/machines/ipdb/{ipdb_id}", get(machine_by_ipdb_id))
        .route("/export", get(export_machines))
        .route("/export/groups", get(export_groups))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn changelog(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Json<Vec<ChangelogEntry>> {
    state.record("/changelog", &params, &headers);
    Json(state.changelog.to_vec())
}

async fn typeahead_search(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Json<Vec<TypeaheadEntry>> {
    state.record("/search/typeahead", &params, &headers);
    let Some(q) = params.get("q").filter(|q| !q.is_empty()) else {
        return Json(Vec::new());
    };
    let include_aliases = flag_param(&params, "include_aliases", true);
    let include_groups = flag_param(&params, "include_groups", false);

    let mut entries: Vec<TypeaheadEntry> = matching_machines(&state.machines, q, include_aliases)
        .into_iter()
        .map(typeahead_entry)
        .collect();
    if include_groups {
        entries.extend(
            state
                .groups
                .iter()
                .filter(|group| contains_ci(&group.name, q))
                .map(|group| TypeaheadEntry {
                    id: group.opdb_id.clone(),
                    text: group.name.clone(),
                    name: group.name.clone(),
                }),
        );
    }
    Json(entries)
}

async fn search_machines(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record("/search", &params, &headers);
    if let Err(denied) = authenticate(&state, &params) {
        return denied;
    }
    let Some(q) = params.get("q").filter(|q| !q.is_empty()) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The given data was invalid.",
                "errors": { "q": ["The q field is required."] },
            })),
        )
            .into_response();
    };
    let include_aliases = flag_param(&params, "include_aliases", true);
    let matches: Vec<Machine> = matching_machines(&state.machines, q, include_aliases)
        .into_iter()
        .cloned()
        .collect();
    Json(matches).into_response()
}

async fn machine_by_opdb_id(
    State(state): State<AppState>,
    Path(opdb_id): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record(&format!("/machines/{opdb_id}"), &params, &headers);
    if let Err(denied) = authenticate(&state, &params) {
        return denied;
    }
    match state.machines.iter().find(|m| m.opdb_id == opdb_id) {
        Some(machine) => Json(machine.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn machine_by_ipdb_id(
    State(state): State<AppState>,
    Path(ipdb_id): Path<u32>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record(&format!("/machines/ipdb/{ipdb_id}"), &params, &headers);
    if let Err(denied) = authenticate(&state, &params) {
        return denied;
    }
    match state.machines.iter().find(|m| m.ipdb_id == Some(ipdb_id)) {
        Some(machine) => Json(machine.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn export_machines(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record("/export", &params, &headers);
    if let Err(denied) = authenticate(&state, &params) {
        return denied;
    }
    Json(state.machines.to_vec()).into_response()
}

async fn export_groups(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record("/export/groups", &params, &headers);
    if let Err(denied) = authenticate(&state, &params) {
        return denied;
    }
    Json(state.groups.to_vec()).into_response()
}

/// Check the `api_token` query parameter the way the real API does: any
/// missing or wrong token gets the same 401 body.
fn authenticate(state: &AppState, params: &BTreeMap<String, String>) -> Result<(), Response> {
    match params.get("api_token") {
        Some(token) if *token == state.api_token => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthenticated." })),
        )
            .into_response()),
    }
}

fn flag_param(params: &BTreeMap<String, String>, name: &str, default: bool) -> bool {
    params.get(name).map(|value| value == "1").unwrap_or(default)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matching_machines<'a>(
    machines: &'a [Machine],
    q: &str,
    include_aliases: bool,
) -> Vec<&'a Machine> {
    machines
        .iter()
        .filter(|machine| {
            contains_ci(&machine.name, q)
                || contains_ci(&machine.shortname, q)
                || (include_aliases
                    && machine.aliases.iter().any(|alias| contains_ci(alias, q)))
        })
        .collect()
}

fn typeahead_entry(machine: &Machine) -> TypeaheadEntry {
    let year = machine.manufacture_date.get(..4).unwrap_or("");
    TypeaheadEntry {
        id: machine.opdb_id.clone(),
        text: format!(
            "{} ({}, {})",
            machine.name, machine.manufacturer.name, year
        ),
        name: machine.name.clone(),
    }
}

fn fixture_machines() -> Vec<Machine> {
    let stern = Manufacturer {
        manufacturer_id: 12,
        name: "Stern".to_string(),
        full_name: "Stern Pinball, Inc.".to_string(),
    };
    let williams = Manufacturer {
        manufacturer_id: 3,
        name: "Williams".to_string(),
        full_name: "Williams Electronic Games, Incorporated".to_string(),
    };
    let bally = Manufacturer {
        manufacturer_id: 2,
        name: "Bally".to_string(),
        full_name: "Bally Manufacturing Corporation".to_string(),
    };
    vec![
        Machine {
            opdb_id: "GRBE4-MQK1Z-A9Yn1".to_string(),
            is_machine: true,
            name: "Metallica (Pro LED)".to_string(),
            shortname: "MET-Pro".to_string(),
            ipdb_id: Some(6179),
            manufacture_date: "2013-04-30".to_string(),
            manufacturer: stern,
            machine_type: "ss".to_string(),
            display: "dmd".to_string(),
            player_count: 4,
            aliases: Vec::new(),
        },
        Machine {
            opdb_id: "G43W4-MZVpe".to_string(),
            is_machine: true,
            name: "Medieval Madness".to_string(),
            shortname: "MM".to_string(),
            ipdb_id: Some(4032),
            manufacture_date: "1997-06-01".to_string(),
            manufacturer: williams,
            machine_type: "ss".to_string(),
            display: "dmd".to_string(),
            player_count: 4,
            aliases: vec!["Medieval Madness (Remake)".to_string()],
        },
        Machine {
            opdb_id: "G4PKQ-MD5LZ".to_string(),
            is_machine: true,
            name: "Attack from Mars".to_string(),
            shortname: "AFM".to_string(),
            ipdb_id: Some(3781),
            manufacture_date: "1995-12-01".to_string(),
            manufacturer: bally,
            machine_type: "ss".to_string(),
            display: "dmd".to_string(),
            player_count: 4,
            aliases: Vec::new(),
        },
    ]
}

fn fixture_groups() -> Vec<MachineGroup> {
    vec![
        MachineGroup {
            opdb_id: "GRBE4".to_string(),
            name: "Metallica".to_string(),
            shortname: "MET".to_string(),
        },
        MachineGroup {
            opdb_id: "G43W4".to_string(),
            name: "Medieval Madness".to_string(),
            shortname: "MM".to_string(),
        },
        MachineGroup {
            opdb_id: "G4PKQ".to_string(),
            name: "Attack from Mars".to_string(),
            shortname: "AFM".to_string(),
        },
    ]
}

fn fixture_changelog() -> Vec<ChangelogEntry> {
    vec![
        ChangelogEntry {
            changelog_id: 1,
            opdb_id_deleted: "GR7D3-MDE41".to_string(),
            action: "moved".to_string(),
            opdb_id_replacement: Some("GRBE4-MQK1Z-A9Yn1".to_string()),
            created_at: "2024-02-14T09:30:00Z".to_string(),
            updated_at: "2024-02-14T09:30:00Z".to_string(),
        },
        ChangelogEntry {
            changelog_id: 2,
            opdb_id_deleted: "G5XkP-M33Qz".to_string(),
            action: "deleted".to_string(),
            opdb_id_replacement: None,
            created_at: "2024-05-02T17:05:00Z".to_string(),
            updated_at: "2024-05-02T17:05:00Z".to_string(),
        },
    ]
}

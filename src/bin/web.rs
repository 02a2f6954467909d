//! JSON API over the tournament service, backed by the in-memory store.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! SYNC_INTERVAL_SECS sets how often queued changes are flushed.

use actix_web::{
    get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use serde::Deserialize;
use std::sync::RwLock;
use tournament_planner::{
    CreateTournament, EngineConfig, ErrorKind, GroupDraw, MatchId, MatchStatus, MemoryStore,
    RemoteSink, ServerConfig, SyncEntry, SyncError, TournamentError, TournamentId,
    TournamentService,
};

type AppState = Data<RwLock<TournamentService<MemoryStore>>>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct AddTeamBody {
    name: String,
}

#[derive(Deserialize)]
struct DrawGroupsBody {
    groups: Vec<GroupDraw>,
}

#[derive(Deserialize)]
struct ReportResultBody {
    team1_score: u32,
    team2_score: u32,
    #[serde(default = "default_result_status")]
    status: MatchStatus,
}

fn default_result_status() -> MatchStatus {
    MatchStatus::Complete
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

#[derive(Deserialize)]
struct MatchPath {
    match_id: MatchId,
}

/// Mirrors queued changes into the log. Stands in for a remote system.
struct LogSink;

impl RemoteSink for LogSink {
    fn push(&mut self, entry: &SyncEntry) -> Result<(), SyncError> {
        let payload =
            serde_json::to_string(entry).map_err(|e| SyncError::Rejected(e.to_string()))?;
        log::info!("sync {}", payload);
        Ok(())
    }
}

fn error_response(e: TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string(), "kind": e.kind() });
    match e.kind() {
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Precondition => HttpResponse::Conflict().json(body),
        ErrorKind::Persistence => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().json(body)
        }
        ErrorKind::Configuration | ErrorKind::TieBreak | ErrorKind::InvalidInput => {
            HttpResponse::BadRequest().json(body)
        }
    }
}

fn lock_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("lock error")
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "tournament-planner",
    })
}

/// Plan and create a tournament; returns it with its id.
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournament>) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service
        .create_tournament(body.into_inner())
        .and_then(|id| service.get_tournament(id))
    {
        Ok(t) => HttpResponse::Ok().json(t),
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    let service = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.list_tournaments() {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// Current stage, its status and the stage after it.
#[get("/api/tournaments/{id}/status")]
async fn api_tournament_status(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let service = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.get_tournament_status(path.id) {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments/{id}/standings")]
async fn api_group_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let service = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.get_group_standings(path.id) {
        Ok(tables) => HttpResponse::Ok().json(tables),
        Err(e) => error_response(e),
    }
}

#[post("/api/tournaments/{id}/teams")]
async fn api_add_team(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<AddTeamBody>,
) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.add_team(path.id, &body.name) {
        Ok(team_id) => HttpResponse::Ok().json(serde_json::json!({ "team_id": team_id })),
        Err(e) => error_response(e),
    }
}

/// Set the members of the given groups.
#[put("/api/tournaments/{id}/groups")]
async fn api_draw_groups(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<DrawGroupsBody>,
) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service
        .draw_groups(path.id, &body.groups)
        .and_then(|()| service.get_group_standings(path.id))
    {
        Ok(tables) => HttpResponse::Ok().json(tables),
        Err(e) => error_response(e),
    }
}

/// Fill open group slots at random.
#[post("/api/tournaments/{id}/groups/auto-assign")]
async fn api_auto_assign(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.auto_assign(path.id) {
        Ok(placed) => HttpResponse::Ok().json(serde_json::json!({ "placed": placed })),
        Err(e) => error_response(e),
    }
}

/// Generate the matches of the next stage.
#[post("/api/tournaments/{id}/next-stage")]
async fn api_next_stage(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.generate_next_stage_matches(path.id) {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(e) => error_response(e),
    }
}

/// Redraw the current stage while none of its matches has started.
#[post("/api/tournaments/{id}/regenerate")]
async fn api_regenerate(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.regenerate_current_stage(path.id) {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments/{id}/matches")]
async fn api_matches(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let service = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.tournament_matches(path.id) {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(e) => error_response(e),
    }
}

#[put("/api/matches/{match_id}/result")]
async fn api_report_result(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<ReportResultBody>,
) -> HttpResponse {
    let mut service = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.report_match_result(path.match_id, body.team1_score, body.team2_score, body.status)
    {
        Ok(game) => HttpResponse::Ok().json(game),
        Err(e) => error_response(e),
    }
}

/// Table over every completed match ever played.
#[get("/api/all-time-table")]
async fn api_all_time_table(state: AppState) -> HttpResponse {
    let service = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match service.all_time_table() {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => error_response(e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let server = ServerConfig::from_env();
    let engine = EngineConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let service = TournamentService::new(MemoryStore::new(), engine)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let state = Data::new(RwLock::new(service));

    // Background task: push queued changes to the sink on every tick.
    let state_sync = state.clone();
    let sync_interval = server.sync_interval;
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(sync_interval);
        let mut sink = LogSink;
        loop {
            interval.tick().await;
            let mut service = match state_sync.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            if service.sync_queue().is_empty() {
                continue;
            }
            let report = service.flush_sync(&mut sink);
            log::info!(
                "Sync flush: {} pushed, {} retained, {} dropped",
                report.pushed,
                report.retained,
                report.dropped
            );
        }
    });

    let bind = (server.host.clone(), server.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_list_tournaments)
            .service(api_tournament_status)
            .service(api_group_standings)
            .service(api_add_team)
            .service(api_draw_groups)
            .service(api_auto_assign)
            .service(api_next_stage)
            .service(api_regenerate)
            .service(api_matches)
            .service(api_report_result)
            .service(api_all_time_table)
    })
    .bind(bind)?
    .run()
    .await
}

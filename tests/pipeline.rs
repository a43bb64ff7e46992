mod common;

use std::collections::BTreeMap;

use apifootball_sync::Pipeline;
use apifootball_sync::dataset_store::DatasetName;
use apifootball_sync::error::SyncError;
use apifootball_sync::normalize::{
    CountryRecord, EventsDataset, LeagueRecord, MatchesDataset, PlayersDataset,
};

use common::{ScriptedTransport, read_fixture, test_settings};

#[test]
fn sync_leagues_writes_countries_and_leagues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = ScriptedTransport::new().with_reply(read_fixture("leagues.json"));
    let pipeline = Pipeline::new(test_settings(dir.path()), &transport);

    let summary = pipeline.sync_leagues().expect("sync leagues");

    assert_eq!(summary.captures.len(), 1);
    assert!(summary.captures[0].starts_with(dir.path().join("raw_data").join("leagues")));
    let names = summary.datasets.iter().map(|d| d.name).collect::<Vec<_>>();
    assert_eq!(names, vec![DatasetName::Countries, DatasetName::Leagues]);

    let store = pipeline.converger().datasets();
    let countries: BTreeMap<String, CountryRecord> =
        store.read(DatasetName::Countries).expect("countries");
    let leagues: BTreeMap<u64, LeagueRecord> = store.read(DatasetName::Leagues).expect("leagues");
    assert_eq!(countries["AA"].name, "World");
    assert_eq!(leagues[&140].country, "ES");
    assert!(store.dir().ends_with("newest_data"));
}

#[test]
fn season_matches_share_one_run_folder() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = test_settings(dir.path());
    settings.active_leagues = vec![39, 140, 39];
    settings.current_season = 2022;
    let la_liga = read_fixture("fixtures_league_39.json")
        .replace("867946", "880001")
        .replace("867947", "880002")
        .replace("867948", "880003")
        .replace(r#""id": 39"#, r#""id": 140"#);
    let transport = ScriptedTransport::new()
        .with_reply(read_fixture("fixtures_league_39.json"))
        .with_reply(la_liga);
    let pipeline = Pipeline::new(settings, &transport);

    let summary = pipeline.sync_season_matches().expect("sync fixtures");

    let queries = transport
        .data_calls()
        .into_iter()
        .map(|(_, q)| q)
        .collect::<Vec<_>>();
    assert_eq!(
        queries,
        vec!["league=39&season=2022&page=1", "league=140&season=2022&page=1"]
    );
    assert_eq!(summary.captures.len(), 2);
    assert_eq!(summary.captures[0].parent(), summary.captures[1].parent());

    let matches: MatchesDataset = pipeline
        .converger()
        .datasets()
        .read(DatasetName::Matches)
        .expect("matches");
    assert_eq!(matches.len(), 6);
    assert_eq!(matches[&880001].league_id, 140);
}

#[test]
fn no_active_leagues_is_missing_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = test_settings(dir.path());
    settings.active_leagues.clear();
    let transport = ScriptedTransport::new();
    let pipeline = Pipeline::new(settings, &transport);

    let err = pipeline.sync_season_matches().unwrap_err();
    assert!(matches!(err, SyncError::MissingInput(_)));
    assert!(transport.data_calls().is_empty());
    assert_eq!(transport.status_calls(), 0);
}

#[test]
fn empty_id_lists_fail_before_any_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = ScriptedTransport::new();
    let pipeline = Pipeline::new(test_settings(dir.path()), &transport);

    assert!(matches!(
        pipeline.sync_events(&[]).unwrap_err(),
        SyncError::MissingInput(_)
    ));
    assert!(matches!(
        pipeline.sync_squads(&[]).unwrap_err(),
        SyncError::MissingInput(_)
    ));
    assert_eq!(transport.status_calls(), 0);
    assert!(transport.data_calls().is_empty());
}

#[test]
fn sync_squads_writes_players() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = ScriptedTransport::new().with_reply(read_fixture("squads_team_50.json"));
    let pipeline = Pipeline::new(test_settings(dir.path()), &transport);

    let summary = pipeline.sync_squads(&[50, 50]).expect("sync squads");
    assert_eq!(
        transport.data_calls(),
        vec![("players/squads".to_string(), "team=50&page=1".to_string())]
    );
    assert_eq!(summary.datasets[0].records, 3);

    let players: PlayersDataset = pipeline
        .converger()
        .datasets()
        .read(DatasetName::Players)
        .expect("players");
    assert_eq!(players[&18861].position, "defender");
}

#[test]
fn sync_events_writes_goals_per_fixture() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport =
        ScriptedTransport::new().with_reply(read_fixture("events_fixture_867946.json"));
    let pipeline = Pipeline::new(test_settings(dir.path()), &transport);

    pipeline.sync_events(&[867946]).expect("sync events");

    let events: EventsDataset = pipeline
        .converger()
        .datasets()
        .read(DatasetName::Events)
        .expect("events");
    assert_eq!(events[&867946].len(), 2);
}

#[test]
fn failed_request_leaves_datasets_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = ScriptedTransport::new().with_quota(100, 90);
    let pipeline = Pipeline::new(test_settings(dir.path()), &transport);

    let err = pipeline.sync_leagues().unwrap_err();
    assert!(matches!(err, SyncError::SafetyMargin { .. }));
    assert!(!pipeline.converger().datasets().dir().exists());
}

#[test]
fn check_quota_reports_remaining() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = ScriptedTransport::new().with_quota(100, 37);
    let pipeline = Pipeline::new(test_settings(dir.path()), &transport);

    let quota = pipeline.check_quota().expect("quota");
    assert_eq!(quota.remaining, 63);
    assert_eq!(quota.used, 37);
}

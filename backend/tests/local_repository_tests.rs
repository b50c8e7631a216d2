//! Behavior of the in-memory repository through the repository traits.

use soccer_backend::db::repositories::LocalRepository;
use soccer_backend::db::repository::{
    FavoriteRepository, PlayerRepository, RepositoryError, StandingRepository, TeamRepository,
};
use soccer_backend::models::{
    NewPlayer, NewStanding, NewTeam, PageRequest, StandingQuery, TeamId, UserId,
};
use soccer_backend::search::{CursorBounds, SearchQuery, SortKey};

fn new_team(fullname: &str, liga: &str) -> NewTeam {
    NewTeam {
        shortname: fullname.chars().take(3).collect(),
        fullname: fullname.to_string(),
        liga: liga.to_string(),
        stadion: String::new(),
        website: String::new(),
        birthday: 0,
    }
}

fn new_player(fullname: &str, team_id: Option<TeamId>) -> NewPlayer {
    NewPlayer {
        shortname: fullname.to_string(),
        fullname: fullname.to_string(),
        backnumber: 10,
        team_id,
        height: 170,
        weight: 65,
        nation: "Indonesia".to_string(),
    }
}

fn search(keyword: &str, sort: SortKey, bounds: CursorBounds, page: PageRequest) -> SearchQuery {
    SearchQuery::new(Some(keyword), sort, bounds, page).unwrap()
}

async fn seed_teams(repo: &LocalRepository, names: &[&str]) -> Vec<TeamId> {
    let mut ids = Vec::new();
    for name in names {
        ids.push(repo.insert_team(new_team(name, "Liga 1")).await.unwrap().id);
    }
    ids
}

// =========================================================
// Teams
// =========================================================

#[tokio::test]
async fn test_health_check() {
    let repo = LocalRepository::new();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_page_past_the_end_is_empty() {
    let repo = LocalRepository::new();
    seed_teams(&repo, &["A FC", "B FC", "C FC"]).await;

    let page = repo
        .list_teams(Some("Liga 1"), PageRequest::new(3, 2, 100).unwrap())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
    assert!(page.has_prev());
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_get_teams_skips_deleted_and_unknown() {
    let repo = LocalRepository::new();
    let ids = seed_teams(&repo, &["A FC", "B FC"]).await;
    repo.soft_delete_team(ids[0]).await.unwrap();

    let teams = repo.get_teams(&[ids[0], ids[1], TeamId::new(99)]).await.unwrap();
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, ids[1]);

    assert!(!repo.soft_delete_team(ids[0]).await.unwrap());
}

#[tokio::test]
async fn test_save_deleted_team_is_not_found() {
    let repo = LocalRepository::new();
    let team = repo.insert_team(new_team("A FC", "Liga 1")).await.unwrap();
    repo.soft_delete_team(team.id).await.unwrap();

    let err = repo.save_team(&team).await.unwrap_err();
    assert!(err.is_not_found());
}

// =========================================================
// Search
// =========================================================

#[tokio::test]
async fn test_search_is_case_insensitive_and_literal() {
    let repo = LocalRepository::new();
    seed_teams(&repo, &["PERSIJA Jakarta", "100% Bola", "1000 Bola"]).await;

    let page = repo
        .search_teams(&search("persija", SortKey::Match, CursorBounds::default(), PageRequest::default()))
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let page = repo
        .search_teams(&search("0% bola", SortKey::Match, CursorBounds::default(), PageRequest::default()))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].fullname, "100% Bola");
}

#[tokio::test]
async fn test_search_combined_cursor_bounds() {
    let repo = LocalRepository::new();
    let ids = seed_teams(&repo, &["Bola 1", "Bola 2", "Bola 3", "Bola 4", "Bola 5"]).await;

    let bounds = CursorBounds {
        next_id: Some(ids[4].value()),
        last_id: Some(ids[0].value()),
    };
    let page = repo
        .search_teams(&search("bola", SortKey::IdDesc, bounds, PageRequest::default()))
        .await
        .unwrap();
    let found: Vec<TeamId> = page.items.iter().map(|t| t.id).collect();
    assert_eq!(found, vec![ids[3], ids[2], ids[1]]);
}

#[tokio::test]
async fn test_search_name_sorts() {
    let repo = LocalRepository::new();
    seed_teams(&repo, &["Bola C", "bola a", "Bola B"]).await;

    let page = repo
        .search_teams(&search("bola", SortKey::NameAsc, CursorBounds::default(), PageRequest::default()))
        .await
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|t| t.fullname.as_str()).collect();
    assert_eq!(names, vec!["bola a", "Bola B", "Bola C"]);

    let page = repo
        .search_teams(&search("bola", SortKey::NameDesc, CursorBounds::default(), PageRequest::default()))
        .await
        .unwrap();
    assert_eq!(page.items[0].fullname, "Bola C");
}

#[tokio::test]
async fn test_search_players_hides_deleted() {
    let repo = LocalRepository::new();
    let keep = repo.insert_player(new_player("Evan Dimas", None)).await.unwrap();
    let gone = repo.insert_player(new_player("Evan Dimas Darmono", None)).await.unwrap();
    repo.soft_delete_player(gone.id).await.unwrap();

    let page = repo
        .search_players(&search("evan", SortKey::Match, CursorBounds::default(), PageRequest::default()))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, keep.id);
}

// =========================================================
// Players
// =========================================================

#[tokio::test]
async fn test_player_needs_visible_team() {
    let repo = LocalRepository::new();
    let team = repo.insert_team(new_team("A FC", "Liga 1")).await.unwrap();
    repo.soft_delete_team(team.id).await.unwrap();

    let err = repo
        .insert_player(new_player("Someone", Some(team.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError { .. }));
}

#[tokio::test]
async fn test_list_players_by_team() {
    let repo = LocalRepository::new();
    let ids = seed_teams(&repo, &["A FC", "B FC"]).await;
    repo.insert_player(new_player("One", Some(ids[0]))).await.unwrap();
    let newest = repo.insert_player(new_player("Two", Some(ids[0]))).await.unwrap();
    repo.insert_player(new_player("Three", Some(ids[1]))).await.unwrap();

    let page = repo
        .list_players(Some(ids[0]), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, newest.id);
}

// =========================================================
// Favorites and standings
// =========================================================

#[tokio::test]
async fn test_favorites_hide_deleted_teams() {
    let repo = LocalRepository::new();
    let ids = seed_teams(&repo, &["A FC", "B FC"]).await;
    let user = UserId::new(1);
    repo.insert_favorite(user, ids[0]).await.unwrap();
    repo.insert_favorite(user, ids[1]).await.unwrap();
    repo.soft_delete_team(ids[0]).await.unwrap();

    let page = repo.list_favorites(user, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].team_id, ids[1]);
}

#[tokio::test]
async fn test_inactive_favorite_still_blocks_insert() {
    let repo = LocalRepository::new();
    let ids = seed_teams(&repo, &["A FC"]).await;
    let user = UserId::new(1);

    let mut favorite = repo.insert_favorite(user, ids[0]).await.unwrap();
    favorite.is_deleted = true;
    repo.save_favorite(&favorite).await.unwrap();

    let err = repo.insert_favorite(user, ids[0]).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict { .. }));

    let found = repo.find_favorite(user, ids[0]).await.unwrap().unwrap();
    assert!(!found.is_active());
}

#[tokio::test]
async fn test_standings_scoped_by_league_and_season() {
    let repo = LocalRepository::new();
    let ids = seed_teams(&repo, &["A FC", "B FC"]).await;

    for (team, liga, periode, position) in [
        (ids[0], "Liga 1", 2023, 1),
        (ids[1], "Liga 1", 2023, 2),
        (ids[0], "Liga 1", 2024, 5),
        (ids[1], "Liga 2", 2023, 1),
    ] {
        repo.upsert_standing(NewStanding {
            team_id: team,
            liga: liga.to_string(),
            periode,
            position,
            points: 0,
        })
        .await
        .unwrap();
    }
    repo.soft_delete_team(ids[1]).await.unwrap();

    let table = repo
        .list_standings(&StandingQuery::new("Liga 1", Some(2023)))
        .await
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table[0].team_id, ids[0]);
    assert_eq!(table[0].position, 1);
}

use minado_app::{GameSession, SessionAction, SessionError, SessionState};
use minado_core::RevealOutcome;
use tempfile::TempDir;

fn session(dir: &TempDir) -> GameSession {
    GameSession::new(dir.path())
}

#[test]
fn trivial_board_wins_and_records_everything() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);
    session.set_player_name("tester");

    session.new_game(1, 0).unwrap();
    assert_eq!(session.state(), SessionState::Playing);

    let outcome = session.reveal((0, 0)).unwrap();
    assert_eq!(outcome, RevealOutcome::Won);
    assert_eq!(session.state(), SessionState::Won);

    let board = session.leaderboard(1, 0);
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].name, "tester");
    assert!(board[0].time_secs < 1.0);

    assert_eq!(session.stats().total_games, 1);
    assert_eq!(session.stats().total_wins, 1);
    let unlocked: Vec<&str> = session
        .achievements()
        .iter()
        .filter(|a| a.unlocked)
        .map(|a| a.id.key())
        .collect();
    assert_eq!(unlocked, vec!["first_game", "no_flags", "speed_demon"]);
}

#[test]
fn illegal_actions_error_and_leave_the_state_alone() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);

    assert_eq!(
        session.reveal((0, 0)).unwrap_err(),
        SessionError::IllegalAction {
            state: SessionState::Menu,
            action: SessionAction::Reveal,
        }
    );
    assert!(matches!(
        session.restart().unwrap_err(),
        SessionError::IllegalAction { .. }
    ));
    assert_eq!(session.state(), SessionState::Menu);

    session.new_game(1, 0).unwrap();
    session.reveal((0, 0)).unwrap();
    assert_eq!(session.state(), SessionState::Won);
    assert!(matches!(
        session.toggle_flag((0, 0)).unwrap_err(),
        SessionError::IllegalAction { .. }
    ));

    // terminal states can start over
    session.restart().unwrap();
    assert_eq!(session.state(), SessionState::Playing);
}

#[test]
fn zero_sized_game_is_rejected_from_the_menu() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);

    assert!(session.new_game(0, 10).is_err());
    assert_eq!(session.state(), SessionState::Menu);
}

#[test]
fn every_full_game_ends_and_is_recorded_once() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);
    session.new_game(9, 10).unwrap();

    'sweep: for x in 0..9 {
        for y in 0..9 {
            if session.state() != SessionState::Playing {
                break 'sweep;
            }
            session.reveal((x, y)).unwrap();
        }
    }

    assert!(matches!(
        session.state(),
        SessionState::Won | SessionState::Lost
    ));
    assert_eq!(session.stats().total_games, 1);
    assert_eq!(session.stats().games_by_difficulty.beginner, 1);
    assert_eq!(
        session.stats().total_wins + session.stats().total_losses,
        1
    );
}

#[test]
fn restart_hands_out_a_fresh_board() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);
    session.new_game(9, 10).unwrap();
    session.reveal((4, 4)).unwrap();
    assert!(session.cell_view((4, 4)).unwrap().is_revealed);

    session.restart().unwrap();

    assert_eq!(session.state(), SessionState::Playing);
    for x in 0..9 {
        for y in 0..9 {
            let cell = session.cell_view((x, y)).unwrap();
            assert!(!cell.is_revealed);
            assert!(!cell.is_flagged);
        }
    }
    assert_eq!(session.elapsed_secs(), 0.0);
    assert_eq!(session.mines_left(), 10);
}

#[test]
fn records_survive_reopening_the_session() {
    let dir = TempDir::new().unwrap();
    {
        let mut session = session(&dir);
        session.new_game(1, 0).unwrap();
        session.reveal((0, 0)).unwrap();
    }

    let reopened = GameSession::new(dir.path());
    assert_eq!(reopened.stats().total_wins, 1);
    assert_eq!(reopened.leaderboard(1, 0).len(), 1);
    assert!(
        reopened
            .achievements()
            .iter()
            .any(|a| a.id.key() == "first_game" && a.unlocked)
    );
}

#[test]
fn configurations_list_played_and_current_boards() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);
    session.new_game(1, 0).unwrap();
    session.reveal((0, 0)).unwrap();

    session.new_game(16, 40).unwrap();
    assert_eq!(session.configurations(), vec![(1, 0), (16, 40)]);

    session.clear_leaderboard(1, 0);
    assert!(session.leaderboard(1, 0).is_empty());
    assert_eq!(session.configurations(), vec![(16, 40)]);
}

#[test]
fn reveal_schedules_events_for_the_renderer() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);
    session.new_game(9, 10).unwrap();
    session.reveal((4, 4)).unwrap();

    let events = session.pending_events();
    assert!(!events.is_empty());
    assert!(events.iter().any(|event| event.coords == (4, 4)));
}

#[test]
fn player_name_is_capped_for_the_leaderboard() {
    let dir = TempDir::new().unwrap();
    let mut session = session(&dir);
    session.set_player_name("a very long player name");
    assert_eq!(session.player_name(), "a very long ");

    session.new_game(1, 0).unwrap();
    session.reveal((0, 0)).unwrap();
    assert_eq!(session.leaderboard(1, 0)[0].name, "a very long ");
}

use cybertraining_api::models::snapshot::Snapshot;
use cybertraining_api::models::user::UserAnswer;
use cybertraining_api::services::seed;

/// Default catalog with mirror credentials filled in, so credential-stripping
/// behavior is observable.
pub fn sample_snapshot() -> Snapshot {
    let mut snapshot = seed::default_snapshot();
    snapshot.settings.github_owner = "acme".to_string();
    snapshot.settings.github_repo = "training-mirror".to_string();
    snapshot.settings.github_path = "data/backup.json".to_string();
    snapshot.settings.github_pat = "ghp_supersecret".to_string();
    snapshot
}

/// Synthetic answer sheet with a controlled correct/wrong split.
pub fn answer_sheet(correct: usize, wrong: usize) -> Vec<UserAnswer> {
    let mut answers = Vec::new();
    for index in 0..correct + wrong {
        answers.push(UserAnswer {
            question_id: 9_000_000 + index as i64,
            selected: "option".to_string(),
            correct: index < correct,
        });
    }
    answers
}

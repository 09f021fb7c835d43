use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::models::category::{Module, ModuleCategory, ModuleStatus};
use crate::models::email::Email;
use crate::models::quiz::{FolderQuestion, Question, Quiz};
use crate::models::settings::AppSettings;
use crate::models::snapshot::Snapshot;
use crate::models::user::{TrainingStatus, User, UserAnswer};

/// Score (in percent, rounded) a user must reach to pass.
pub const PASS_THRESHOLD: u32 = 70;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Rejected before any state mutation, reported synchronously.
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
}

type StoreResult<T> = Result<T, StoreError>;

/// The in-memory source of truth while the application runs. Mutation only
/// happens through the action methods here; every successful mutation bumps
/// the revision channel the sync orchestrator debounces on.
pub struct RecordStore {
    state: RwLock<Snapshot>,
    revision: watch::Sender<u64>,
}

impl RecordStore {
    pub fn new(snapshot: Snapshot) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(snapshot),
            revision,
        }
    }

    /// Revision feed for the sync orchestrator.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    fn touch(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    // --- quizzes -----------------------------------------------------------

    pub async fn create_quiz(&self, id: &str, name: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        validate_quiz_identity(&state.quizzes, id, name)?;
        state.quizzes.push(Quiz {
            id: id.to_string(),
            name: name.to_string(),
            questions: Vec::new(),
        });
        drop(state);
        self.touch();
        Ok(())
    }

    /// Removes the quiz, its module entry in every category, and any category
    /// left empty by that removal (scrubbing that category from every user's
    /// assignments).
    pub async fn delete_quiz(&self, quiz_id: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let before = state.quizzes.len();
        state.quizzes.retain(|quiz| quiz.id != quiz_id);
        if state.quizzes.len() == before {
            return Err(StoreError::NotFound("Quiz"));
        }

        for category in &mut state.module_categories {
            category.modules.retain(|module| module.id != quiz_id);
        }
        let emptied: Vec<String> = state
            .module_categories
            .iter()
            .filter(|category| category.modules.is_empty())
            .map(|category| category.id.clone())
            .collect();
        state
            .module_categories
            .retain(|category| !category.modules.is_empty());
        for user in &mut state.users {
            user.assigned_exams.retain(|id| !emptied.contains(id));
            user.module_progress.remove(quiz_id);
        }
        drop(state);
        self.touch();
        Ok(())
    }

    pub async fn add_question(
        &self,
        quiz_id: &str,
        category: &str,
        question: &str,
        options: Vec<String>,
        correct_answer: &str,
    ) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        let id = next_question_id(&state.quizzes);
        let candidate = Question {
            id,
            category: category.to_string(),
            question: question.to_string(),
            options,
            correct_answer: correct_answer.to_string(),
        };
        if !candidate.is_well_formed() {
            return Err(StoreError::Validation(
                "Question text must be non-empty and the correct answer must be one of the options"
                    .to_string(),
            ));
        }
        let quiz = state
            .quizzes
            .iter_mut()
            .find(|quiz| quiz.id == quiz_id)
            .ok_or(StoreError::NotFound("Quiz"))?;
        quiz.questions.push(candidate);
        recompute_module_counts(&mut state);
        drop(state);
        self.touch();
        Ok(id)
    }

    pub async fn update_question(&self, quiz_id: &str, question: Question) -> StoreResult<()> {
        if !question.is_well_formed() {
            return Err(StoreError::Validation(
                "Question text must be non-empty and the correct answer must be one of the options"
                    .to_string(),
            ));
        }
        let mut state = self.state.write().await;
        let quiz = state
            .quizzes
            .iter_mut()
            .find(|quiz| quiz.id == quiz_id)
            .ok_or(StoreError::NotFound("Quiz"))?;
        let slot = quiz
            .questions
            .iter_mut()
            .find(|existing| existing.id == question.id)
            .ok_or(StoreError::NotFound("Question"))?;
        *slot = question;
        drop(state);
        self.touch();
        Ok(())
    }

    pub async fn delete_question(&self, quiz_id: &str, question_id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let quiz = state
            .quizzes
            .iter_mut()
            .find(|quiz| quiz.id == quiz_id)
            .ok_or(StoreError::NotFound("Quiz"))?;
        let before = quiz.questions.len();
        quiz.questions.retain(|question| question.id != question_id);
        if quiz.questions.len() == before {
            return Err(StoreError::NotFound("Question"));
        }
        recompute_module_counts(&mut state);
        drop(state);
        self.touch();
        Ok(())
    }

    // --- categories --------------------------------------------------------

    pub async fn create_category(
        &self,
        id: &str,
        title: &str,
        mut modules: Vec<Module>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if title.trim().is_empty() {
            return Err(StoreError::Validation(
                "Category title must not be empty".to_string(),
            ));
        }
        if state.module_categories.iter().any(|category| {
            category.id == id || category.title.eq_ignore_ascii_case(title)
        }) {
            return Err(StoreError::Validation(format!(
                "A category named '{title}' already exists"
            )));
        }
        if modules.is_empty() {
            return Err(StoreError::Validation(
                "A category must group at least one module".to_string(),
            ));
        }
        for module in &modules {
            if !state.quizzes.iter().any(|quiz| quiz.id == module.id) {
                return Err(StoreError::Validation(format!(
                    "Module '{}' has no matching quiz",
                    module.id
                )));
            }
        }
        for module in &mut modules {
            module.status = ModuleStatus::NotStarted;
        }
        state.module_categories.push(ModuleCategory {
            id: id.to_string(),
            title: title.to_string(),
            modules,
        });
        recompute_module_counts(&mut state);
        drop(state);
        self.touch();
        Ok(())
    }

    /// Deleting a category cascades: its id disappears from every user's
    /// assignments and each member module's underlying quiz is removed with
    /// all its questions.
    pub async fn delete_category(&self, category_id: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let position = state
            .module_categories
            .iter()
            .position(|category| category.id == category_id)
            .ok_or(StoreError::NotFound("Category"))?;
        let removed = state.module_categories.remove(position);
        let module_ids: HashSet<String> = removed
            .modules
            .into_iter()
            .map(|module| module.id)
            .collect();

        state.quizzes.retain(|quiz| !module_ids.contains(&quiz.id));
        for user in &mut state.users {
            user.assigned_exams.retain(|id| id != category_id);
            user.module_progress
                .retain(|module_id, _| !module_ids.contains(module_id));
        }
        drop(state);
        self.touch();
        Ok(())
    }

    // --- users -------------------------------------------------------------

    pub async fn create_user(&self, mut user: User) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        if user.username.trim().is_empty() || user.full_name.trim().is_empty() {
            return Err(StoreError::Validation(
                "Username and full name must not be empty".to_string(),
            ));
        }
        if state
            .users
            .iter()
            .any(|existing| existing.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::Validation(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }
        if user.id == 0 {
            user.id = state.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        } else if state.users.iter().any(|existing| existing.id == user.id) {
            return Err(StoreError::Validation(format!(
                "User id {} is already taken",
                user.id
            )));
        }
        let id = user.id;
        state.users.push(user);
        drop(state);
        self.touch();
        Ok(id)
    }

    pub async fn update_user(&self, user: User) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let slot = state
            .users
            .iter_mut()
            .find(|existing| existing.id == user.id)
            .ok_or(StoreError::NotFound("User"))?;
        *slot = user;
        drop(state);
        self.touch();
        Ok(())
    }

    pub async fn delete_user(&self, user_id: i64) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let before = state.users.len();
        state.users.retain(|user| user.id != user_id);
        if state.users.len() == before {
            return Err(StoreError::NotFound("User"));
        }
        drop(state);
        self.touch();
        Ok(())
    }

    pub async fn assign_exams(&self, user_id: i64, exam_ids: Vec<String>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        for exam_id in &exam_ids {
            if !state
                .module_categories
                .iter()
                .any(|category| &category.id == exam_id)
            {
                return Err(StoreError::Validation(format!(
                    "Unknown category '{exam_id}'"
                )));
            }
        }
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(StoreError::NotFound("User"))?;
        user.assigned_exams = exam_ids;
        drop(state);
        self.touch();
        Ok(())
    }

    // --- progress & scoring -------------------------------------------------

    /// Records a module submission: stores the answers (replacing earlier
    /// answers to the same questions), marks the module completed, and runs
    /// the completion rule — a passed/failed transition happens only once
    /// every module of every assigned category is completed.
    pub async fn submit_module(
        &self,
        user_id: i64,
        module_id: &str,
        answers: Vec<UserAnswer>,
    ) -> StoreResult<TrainingStatus> {
        let mut state = self.state.write().await;
        if !state
            .module_categories
            .iter()
            .flat_map(|category| &category.modules)
            .any(|module| module.id == module_id)
        {
            return Err(StoreError::NotFound("Module"));
        }

        let assigned: Vec<String> = {
            let user = state
                .users
                .iter()
                .find(|user| user.id == user_id)
                .ok_or(StoreError::NotFound("User"))?;
            user.assigned_exams.clone()
        };
        let assigned_totals = assigned_module_ids(&state.module_categories, &assigned);

        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(StoreError::NotFound("User"))?;

        let submitted: HashSet<i64> = answers.iter().map(|answer| answer.question_id).collect();
        user.answers
            .retain(|answer| !submitted.contains(&answer.question_id));
        user.answers.extend(answers);
        user.module_progress
            .insert(module_id.to_string(), ModuleStatus::Completed);

        let completed = assigned_totals
            .iter()
            .filter(|id| user.module_progress.get(*id) == Some(&ModuleStatus::Completed))
            .count();

        if !assigned_totals.is_empty() && completed == assigned_totals.len() {
            let correct = user.answers.iter().filter(|answer| answer.correct).count();
            let score = score_percent(correct, user.answers.len());
            user.training_status = if score >= PASS_THRESHOLD {
                TrainingStatus::Passed
            } else {
                TrainingStatus::Failed
            };
            user.last_score = Some(score);
            user.submission_date = Some(Utc::now());
        } else if completed > 0 {
            user.training_status = TrainingStatus::InProgress;
        }
        let status = user.training_status;

        // Mirror the per-user progress into the presentation tree.
        for category in &mut state.module_categories {
            for module in &mut category.modules {
                if module.id == module_id {
                    module.status = ModuleStatus::Completed;
                }
            }
        }
        drop(state);
        self.touch();
        Ok(status)
    }

    // --- settings & email log ----------------------------------------------

    pub async fn update_settings(&self, settings: AppSettings) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.settings = settings;
        drop(state);
        self.touch();
        Ok(())
    }

    pub async fn log_email(&self, to: &str, subject: &str, body: &str) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        let id = Utc::now().timestamp_millis();
        state.email_log.push(Email {
            id,
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        });
        drop(state);
        self.touch();
        Ok(id)
    }

    // --- bulk content tools -------------------------------------------------

    /// Imports the folder-structure format: sub-topic name → bare questions.
    /// The whole file is validated before any state mutation. Returns the
    /// number of imported questions.
    pub async fn import_question_folders(
        &self,
        quiz_id: &str,
        folders: &BTreeMap<String, Vec<FolderQuestion>>,
    ) -> StoreResult<usize> {
        for (folder, questions) in folders {
            for question in questions {
                if question.question.trim().is_empty()
                    || question.options.is_empty()
                    || !question.options.contains(&question.correct_answer)
                {
                    return Err(StoreError::Validation(format!(
                        "Malformed question in folder '{folder}'"
                    )));
                }
            }
        }

        let mut state = self.state.write().await;
        let mut next_id = next_question_id(&state.quizzes);
        let quiz = state
            .quizzes
            .iter_mut()
            .find(|quiz| quiz.id == quiz_id)
            .ok_or(StoreError::NotFound("Quiz"))?;

        let mut imported = 0;
        for (folder, questions) in folders {
            for question in questions {
                quiz.questions.push(Question {
                    id: next_id,
                    category: folder.clone(),
                    question: question.question.clone(),
                    options: question.options.clone(),
                    correct_answer: question.correct_answer.clone(),
                });
                next_id += 1;
                imported += 1;
            }
        }
        recompute_module_counts(&mut state);
        drop(state);
        self.touch();
        Ok(imported)
    }

    /// Inverse of `import_question_folders`: questions grouped by category,
    /// ids stripped.
    pub async fn export_question_folders(
        &self,
        quiz_id: &str,
    ) -> StoreResult<BTreeMap<String, Vec<FolderQuestion>>> {
        let state = self.state.read().await;
        let quiz = state
            .quizzes
            .iter()
            .find(|quiz| quiz.id == quiz_id)
            .ok_or(StoreError::NotFound("Quiz"))?;
        let mut folders: BTreeMap<String, Vec<FolderQuestion>> = BTreeMap::new();
        for question in &quiz.questions {
            folders
                .entry(question.category.clone())
                .or_default()
                .push(FolderQuestion {
                    question: question.question.clone(),
                    options: question.options.clone(),
                    correct_answer: question.correct_answer.clone(),
                });
        }
        Ok(folders)
    }

    // --- snapshot import/export ---------------------------------------------

    /// Download/export copy of the state, credential stripped.
    pub async fn export_snapshot(&self) -> Snapshot {
        self.state.read().await.sanitized()
    }

    /// Full-snapshot import; validated before the state is replaced.
    pub async fn import_snapshot(&self, snapshot: Snapshot) -> StoreResult<()> {
        validate_snapshot(&snapshot)?;
        let mut state = self.state.write().await;
        *state = snapshot;
        recompute_module_counts(&mut state);
        drop(state);
        self.touch();
        Ok(())
    }
}

/// Creation-timestamp-derived id, bumped past the current maximum so bulk
/// imports inside one millisecond stay unique.
fn next_question_id(quizzes: &[Quiz]) -> i64 {
    let max = quizzes
        .iter()
        .flat_map(|quiz| &quiz.questions)
        .map(|question| question.id)
        .max()
        .unwrap_or(0);
    Utc::now().timestamp_millis().max(max + 1)
}

/// The module `questions` counts are a materialized view of the quiz arrays;
/// this is the only place that writes them.
fn recompute_module_counts(state: &mut Snapshot) {
    let counts: HashMap<&str, usize> = state
        .quizzes
        .iter()
        .map(|quiz| (quiz.id.as_str(), quiz.questions.len()))
        .collect();
    for category in &mut state.module_categories {
        for module in &mut category.modules {
            if let Some(count) = counts.get(module.id.as_str()) {
                module.questions = *count;
            }
        }
    }
}

fn assigned_module_ids(categories: &[ModuleCategory], assigned: &[String]) -> Vec<String> {
    categories
        .iter()
        .filter(|category| assigned.contains(&category.id))
        .flat_map(|category| &category.modules)
        .map(|module| module.id.clone())
        .collect()
}

pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * correct as f64 / total as f64).round() as u32
}

fn validate_quiz_identity(quizzes: &[Quiz], id: &str, name: &str) -> StoreResult<()> {
    if name.trim().is_empty() || id.trim().is_empty() {
        return Err(StoreError::Validation(
            "Quiz id and name must not be empty".to_string(),
        ));
    }
    if quizzes
        .iter()
        .any(|quiz| quiz.id == id || quiz.name.eq_ignore_ascii_case(name))
    {
        return Err(StoreError::Validation(format!(
            "A quiz named '{name}' already exists"
        )));
    }
    Ok(())
}

fn validate_snapshot(snapshot: &Snapshot) -> StoreResult<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for quiz in &snapshot.quizzes {
        if !ids.insert(quiz.id.as_str()) {
            return Err(StoreError::Validation(format!(
                "Duplicate quiz id '{}'",
                quiz.id
            )));
        }
        if !names.insert(quiz.name.to_lowercase()) {
            return Err(StoreError::Validation(format!(
                "Duplicate quiz name '{}'",
                quiz.name
            )));
        }
        for question in &quiz.questions {
            if !question.is_well_formed() {
                return Err(StoreError::Validation(format!(
                    "Malformed question {} in quiz '{}'",
                    question.id, quiz.id
                )));
            }
        }
    }
    for category in &snapshot.module_categories {
        if category.modules.is_empty() {
            return Err(StoreError::Validation(format!(
                "Category '{}' groups no modules",
                category.id
            )));
        }
        for module in &category.modules {
            if !ids.contains(module.id.as_str()) {
                return Err(StoreError::Validation(format!(
                    "Module '{}' in category '{}' has no matching quiz",
                    module.id, category.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_rounds_before_comparing() {
        assert_eq!(score_percent(7, 10), 70);
        assert_eq!(score_percent(695, 1000), 70); // 69.5 rounds up
        assert_eq!(score_percent(69, 100), 69);
        assert_eq!(score_percent(0, 0), 0);
    }

    #[test]
    fn next_id_moves_past_existing_maximum() {
        let far_future = Utc::now().timestamp_millis() + 1_000_000;
        let quizzes = vec![Quiz {
            id: "q".into(),
            name: "Q".into(),
            questions: vec![Question {
                id: far_future,
                category: "c".into(),
                question: "?".into(),
                options: vec!["a".into()],
                correct_answer: "a".into(),
            }],
        }];
        assert_eq!(next_question_id(&quizzes), far_future + 1);
    }
}

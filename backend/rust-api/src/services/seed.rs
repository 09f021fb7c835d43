use std::collections::HashSet;

use crate::models::category::{Module, ModuleCategory, ModuleStatus};
use crate::models::quiz::{Question, Quiz};
use crate::models::settings::AppSettings;
use crate::models::snapshot::Snapshot;
use crate::models::user::{TrainingStatus, User, UserRole};

pub const ICON_KEYS: [&str; 6] = ["shield", "lock", "mail", "globe", "scale", "file"];
pub const THEMES: [&str; 6] = ["blue", "green", "purple", "orange", "red", "teal"];

/// Base id for seeded questions. Runtime-created questions use the current
/// timestamp in milliseconds and therefore always sort after these.
const SEED_QUESTION_ID: i64 = 1_700_000_000_000;

pub fn default_settings() -> AppSettings {
    AppSettings {
        company_name: "Acme Corp".to_string(),
        certificate_text: "This certifies that {name} has completed the annual cyber security compliance training.".to_string(),
        github_owner: String::new(),
        github_repo: String::new(),
        github_path: String::new(),
        github_pat: String::new(),
    }
}

pub fn default_users() -> Vec<User> {
    let mut users = vec![user(
        1,
        "System Administrator",
        "admin",
        "admin123",
        UserRole::Admin,
        &[],
    )];
    let staff = [
        ("Alice Nguyen", "alice"),
        ("Ben Carter", "ben"),
        ("Carla Mendes", "carla"),
        ("Deepak Rao", "deepak"),
        ("Erin Walsh", "erin"),
    ];
    for (index, (full_name, username)) in staff.iter().enumerate() {
        users.push(user(
            index as i64 + 2,
            full_name,
            username,
            "changeme",
            UserRole::User,
            &["security_essentials", "data_protection", "legal_exam"],
        ));
    }
    users
}

fn user(
    id: i64,
    full_name: &str,
    username: &str,
    password: &str,
    role: UserRole,
    assigned_exams: &[&str],
) -> User {
    User {
        id,
        full_name: full_name.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        role,
        training_status: TrainingStatus::NotStarted,
        assigned_exams: assigned_exams.iter().map(|id| id.to_string()).collect(),
        answers: Vec::new(),
        module_progress: Default::default(),
        last_score: None,
        submission_date: None,
    }
}

pub fn default_quizzes() -> Vec<Quiz> {
    let mut next_id = SEED_QUESTION_ID;
    let mut id = move || {
        next_id += 1;
        next_id
    };

    vec![
        Quiz {
            id: "phishing_awareness".to_string(),
            name: "Phishing Awareness".to_string(),
            questions: vec![
                Question {
                    id: id(),
                    category: "Email Threats".to_string(),
                    question: "A mail from your bank asks you to confirm your password via a link. What do you do?".to_string(),
                    options: vec![
                        "Click the link and log in".to_string(),
                        "Forward it to colleagues".to_string(),
                        "Report it as phishing".to_string(),
                    ],
                    correct_answer: "Report it as phishing".to_string(),
                },
                Question {
                    id: id(),
                    category: "Email Threats".to_string(),
                    question: "Which detail most reliably exposes a spoofed sender?".to_string(),
                    options: vec![
                        "The display name".to_string(),
                        "The full sender address and domain".to_string(),
                        "The signature logo".to_string(),
                    ],
                    correct_answer: "The full sender address and domain".to_string(),
                },
                Question {
                    id: id(),
                    category: "Links".to_string(),
                    question: "Before clicking a link you should...".to_string(),
                    options: vec![
                        "Hover to inspect the real target URL".to_string(),
                        "Trust it if the mail looks official".to_string(),
                        "Open it in a private window".to_string(),
                    ],
                    correct_answer: "Hover to inspect the real target URL".to_string(),
                },
            ],
        },
        Quiz {
            id: "password_security".to_string(),
            name: "Password Security".to_string(),
            questions: vec![
                Question {
                    id: id(),
                    category: "Passwords".to_string(),
                    question: "Which password is strongest?".to_string(),
                    options: vec![
                        "Summer2024!".to_string(),
                        "correct-horse-battery-staple".to_string(),
                        "P@ss1".to_string(),
                    ],
                    correct_answer: "correct-horse-battery-staple".to_string(),
                },
                Question {
                    id: id(),
                    category: "Passwords".to_string(),
                    question: "Your password may be reused...".to_string(),
                    options: vec![
                        "On sites you rarely visit".to_string(),
                        "Never".to_string(),
                        "For internal tools only".to_string(),
                    ],
                    correct_answer: "Never".to_string(),
                },
                Question {
                    id: id(),
                    category: "MFA".to_string(),
                    question: "Multi-factor authentication protects you when...".to_string(),
                    options: vec![
                        "Your password leaks".to_string(),
                        "Your laptop battery dies".to_string(),
                        "You forget your username".to_string(),
                    ],
                    correct_answer: "Your password leaks".to_string(),
                },
            ],
        },
        Quiz {
            id: "data_handling".to_string(),
            name: "Data Handling".to_string(),
            questions: vec![
                Question {
                    id: id(),
                    category: "Classification".to_string(),
                    question: "Customer records should be stored...".to_string(),
                    options: vec![
                        "On your personal drive".to_string(),
                        "In the approved encrypted store".to_string(),
                        "In the team chat".to_string(),
                    ],
                    correct_answer: "In the approved encrypted store".to_string(),
                },
                Question {
                    id: id(),
                    category: "Sharing".to_string(),
                    question: "A vendor asks for a customer export. You...".to_string(),
                    options: vec![
                        "Send it if the vendor is known".to_string(),
                        "Check the data-sharing agreement first".to_string(),
                        "Send an anonymized sample without asking".to_string(),
                    ],
                    correct_answer: "Check the data-sharing agreement first".to_string(),
                },
            ],
        },
        Quiz {
            id: "legal_exam".to_string(),
            name: "Legal & Compliance Exam".to_string(),
            questions: vec![
                Question {
                    id: id(),
                    category: "Regulation".to_string(),
                    question: "A data breach involving personal data must be reported within...".to_string(),
                    options: vec![
                        "72 hours".to_string(),
                        "30 days".to_string(),
                        "Only if customers ask".to_string(),
                    ],
                    correct_answer: "72 hours".to_string(),
                },
                Question {
                    id: id(),
                    category: "Regulation".to_string(),
                    question: "Who is accountable for data you export from a company system?".to_string(),
                    options: vec![
                        "The IT department".to_string(),
                        "You".to_string(),
                        "The system vendor".to_string(),
                    ],
                    correct_answer: "You".to_string(),
                },
                Question {
                    id: id(),
                    category: "Records".to_string(),
                    question: "Retention rules require that contracts are kept...".to_string(),
                    options: vec![
                        "For the legally mandated period".to_string(),
                        "Until the project ends".to_string(),
                        "Forever, everywhere".to_string(),
                    ],
                    correct_answer: "For the legally mandated period".to_string(),
                },
            ],
        },
    ]
}

struct LayoutModule {
    quiz_id: &'static str,
    title: &'static str,
    icon_key: &'static str,
    theme: &'static str,
}

struct LayoutCategory {
    id: &'static str,
    title: &'static str,
    modules: &'static [LayoutModule],
}

/// Built-in category layout; filtered to quizzes that actually exist before
/// it is handed to the client.
const DEFAULT_LAYOUT: &[LayoutCategory] = &[
    LayoutCategory {
        id: "security_essentials",
        title: "Security Essentials",
        modules: &[
            LayoutModule {
                quiz_id: "phishing_awareness",
                title: "Phishing Awareness",
                icon_key: "mail",
                theme: "blue",
            },
            LayoutModule {
                quiz_id: "password_security",
                title: "Password Security",
                icon_key: "lock",
                theme: "green",
            },
        ],
    },
    LayoutCategory {
        id: "data_protection",
        title: "Data Protection",
        modules: &[LayoutModule {
            quiz_id: "data_handling",
            title: "Data Handling",
            icon_key: "shield",
            theme: "purple",
        }],
    },
    LayoutCategory {
        id: "legal_exam",
        title: "Legal & Compliance",
        modules: &[LayoutModule {
            quiz_id: "legal_exam",
            title: "Legal & Compliance Exam",
            icon_key: "scale",
            theme: "orange",
        }],
    },
];

/// Bootstrap derivation used when the remote store holds no category
/// partition: the default layout filtered down to quizzes that exist, plus a
/// synthesized one-module category for every uncovered quiz. Purely additive;
/// never deletes a quiz.
pub fn derive_module_categories(quizzes: &[Quiz]) -> Vec<ModuleCategory> {
    let question_count =
        |quiz_id: &str| -> usize {
            quizzes
                .iter()
                .find(|quiz| quiz.id == quiz_id)
                .map(|quiz| quiz.questions.len())
                .unwrap_or(0)
        };
    let existing: HashSet<&str> = quizzes.iter().map(|quiz| quiz.id.as_str()).collect();

    let mut covered: HashSet<String> = HashSet::new();
    let mut categories = Vec::new();
    for layout in DEFAULT_LAYOUT {
        let modules: Vec<Module> = layout
            .modules
            .iter()
            .filter(|module| existing.contains(module.quiz_id))
            .map(|module| Module {
                id: module.quiz_id.to_string(),
                title: module.title.to_string(),
                questions: question_count(module.quiz_id),
                icon_key: module.icon_key.to_string(),
                status: ModuleStatus::NotStarted,
                theme: module.theme.to_string(),
            })
            .collect();
        if modules.is_empty() {
            continue;
        }
        covered.extend(modules.iter().map(|module| module.id.clone()));
        categories.push(ModuleCategory {
            id: layout.id.to_string(),
            title: layout.title.to_string(),
            modules,
        });
    }

    // Quizzes the default layout does not know get their own one-module
    // category, icon and theme assigned round-robin over the catalogs.
    let mut appended = 0usize;
    for quiz in quizzes {
        if covered.contains(&quiz.id) {
            continue;
        }
        categories.push(ModuleCategory {
            id: quiz.id.clone(),
            title: quiz.name.clone(),
            modules: vec![Module {
                id: quiz.id.clone(),
                title: quiz.name.clone(),
                questions: quiz.questions.len(),
                icon_key: ICON_KEYS[appended % ICON_KEYS.len()].to_string(),
                status: ModuleStatus::NotStarted,
                theme: THEMES[appended % THEMES.len()].to_string(),
            }],
        });
        appended += 1;
    }

    categories
}

/// First-bootstrap state when neither the remote store nor the local cache
/// has anything.
pub fn default_snapshot() -> Snapshot {
    let quizzes = default_quizzes();
    let module_categories = derive_module_categories(&quizzes);
    Snapshot {
        users: default_users(),
        quizzes,
        module_categories,
        settings: default_settings(),
        email_log: Vec::new(),
    }
}

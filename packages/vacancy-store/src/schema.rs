//! Table and index declarations.
//!
//! Every statement is `IF NOT EXISTS`, so applying the list again is a no-op.
//! Indexes are created here only; writes never rebuild them.

pub const CREATE_VACANCIES: &str = r#"
CREATE TABLE IF NOT EXISTS vacancies (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    area TEXT,
    salary_from INTEGER,
    salary_to INTEGER,
    salary_currency TEXT,
    experience TEXT,
    schedule TEXT,
    employment TEXT,
    published_at TEXT,
    employer_name TEXT,
    snippet_requirement TEXT,
    snippet_responsibility TEXT,
    created_date TEXT DEFAULT CURRENT_TIMESTAMP
)
"#;

pub const CREATE_SKILLS: &str = r#"
CREATE TABLE IF NOT EXISTS skills (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vacancy_id INTEGER NOT NULL REFERENCES vacancies (id),
    skill_name TEXT NOT NULL
)
"#;

pub const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_vacancies_area ON vacancies(area)",
    "CREATE INDEX IF NOT EXISTS idx_vacancies_experience ON vacancies(experience)",
    "CREATE INDEX IF NOT EXISTS idx_vacancies_published_at ON vacancies(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_vacancies_salary_from ON vacancies(salary_from)",
    "CREATE INDEX IF NOT EXISTS idx_vacancies_salary_to ON vacancies(salary_to)",
    "CREATE INDEX IF NOT EXISTS idx_skills_vacancy_id ON skills(vacancy_id)",
];

/// All statements in application order.
pub fn statements() -> impl Iterator<Item = &'static str> {
    [CREATE_VACANCIES, CREATE_SKILLS]
        .into_iter()
        .chain(INDEXES.iter().copied())
}

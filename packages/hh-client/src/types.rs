use serde::{Deserialize, Serialize};

/// One page of `GET /vacancies` results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VacancyPage {
    #[serde(default)]
    pub items: Vec<VacancyItem>,
    pub found: u64,
    pub pages: u32,
    pub per_page: u32,
    pub page: u32,
}

/// A single vacancy as returned by the search endpoint.
///
/// Every field is optional on the wire. Missing `id` or `name` decode to an
/// empty string and are rejected later, one record at a time, instead of
/// failing the whole page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VacancyItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub area: Option<NamedRef>,
    pub salary: Option<Salary>,
    pub experience: Option<NamedRef>,
    pub schedule: Option<NamedRef>,
    pub employment: Option<NamedRef>,
    /// Raw timestamp, e.g. `2024-01-15T10:30:00+0300`.
    pub published_at: Option<String>,
    pub employer: Option<Employer>,
    pub snippet: Option<Snippet>,
    /// Search results usually omit this; the detail endpoint fills it.
    #[serde(default)]
    pub key_skills: Vec<KeySkill>,
}

impl VacancyItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_area(mut self, name: impl Into<String>) -> Self {
        self.area = Some(NamedRef::named(name));
        self
    }

    pub fn with_salary(mut self, from: Option<i64>, to: Option<i64>, currency: &str) -> Self {
        self.salary = Some(Salary {
            from,
            to,
            currency: Some(currency.to_string()),
            gross: None,
        });
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.key_skills = skills
            .iter()
            .map(|name| KeySkill {
                name: name.to_string(),
            })
            .collect();
        self
    }
}

/// `{ "id": ..., "name": ... }` dictionary reference (area, experience, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl NamedRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Salary {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub currency: Option<String>,
    pub gross: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Employer {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snippet {
    pub requirement: Option<String>,
    pub responsibility: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySkill {
    pub name: String,
}

/// Subset of `GET /vacancies/{id}` needed for skill tags.
#[derive(Debug, Clone, Deserialize)]
pub struct VacancyDetail {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key_skills: Vec<KeySkill>,
}

impl VacancyDetail {
    pub fn skill_names(&self) -> Vec<String> {
        self.key_skills.iter().map(|s| s.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_search_page() {
        let body = r#"{
            "items": [{
                "id": "93040123",
                "name": "Сварщик",
                "area": {"id": "2", "name": "Санкт-Петербург"},
                "salary": {"from": 50000, "to": null, "currency": "RUR", "gross": false},
                "experience": {"id": "between1And3", "name": "От 1 года до 3 лет"},
                "schedule": {"id": "shift", "name": "Сменный график"},
                "employment": {"id": "full", "name": "Полная занятость"},
                "published_at": "2024-01-15T10:30:00+0300",
                "employer": {"id": "1740", "name": "Завод"},
                "snippet": {"requirement": "Опыт <highlighttext>TIG</highlighttext>", "responsibility": null}
            }],
            "found": 1,
            "pages": 1,
            "per_page": 100,
            "page": 0
        }"#;

        let page: VacancyPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.found, 1);
        assert_eq!(page.items.len(), 1);

        let item = &page.items[0];
        assert_eq!(item.id, "93040123");
        let salary = item.salary.as_ref().unwrap();
        assert_eq!(salary.from, Some(50000));
        assert_eq!(salary.to, None);
        assert!(item.key_skills.is_empty());
        assert!(item.snippet.as_ref().unwrap().responsibility.is_none());
    }

    #[test]
    fn test_missing_page_counters_fail_to_decode() {
        let body = r#"{"items": []}"#;
        assert!(serde_json::from_str::<VacancyPage>(body).is_err());
    }

    #[test]
    fn test_item_without_id_still_decodes() {
        let body = r#"{"items": [{"name": "No id"}], "found": 1, "pages": 1, "per_page": 20, "page": 0}"#;
        let page: VacancyPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.items[0].id, "");
    }

    #[test]
    fn test_detail_skill_names() {
        let body = r#"{"id": "100", "name": "Welder", "key_skills": [{"name": "TIG"}, {"name": "MIG"}]}"#;
        let detail: VacancyDetail = serde_json::from_str(body).unwrap();
        assert_eq!(detail.skill_names(), vec!["TIG", "MIG"]);
    }
}

//! Candidate record definitions
//!
//! A `CandidateRecord` is built once from the fields a profile parser
//! extracted plus the URL the profile was fetched from, and is never mutated
//! afterwards. The column order of the output table is fixed by [`COLUMNS`].

/// Output table columns, in order
pub const COLUMNS: [&str; 15] = [
    "phone_number",
    "name",
    "position",
    "mobile_phone",
    "home_phone",
    "email",
    "gender",
    "salary_expectation",
    "skills",
    "languages",
    "education",
    "work_history",
    "about",
    "desired_positions",
    "url",
];

/// Raw fields extracted from a profile page
///
/// Every field defaults to the empty string, which is also how an absent
/// field appears in the output table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub phone_number: String,
    pub name: String,
    pub position: String,
    pub mobile_phone: String,
    pub home_phone: String,
    pub email: String,
    pub gender: String,
    pub salary_expectation: String,
    pub skills: String,
    pub languages: String,
    pub education: String,
    pub work_history: String,
    pub about: String,
    pub desired_positions: String,
}

/// One harvested candidate, keyed by the profile URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    url: String,
    fields: ProfileFields,
}

impl CandidateRecord {
    /// Creates a record from parsed fields
    ///
    /// Returns `None` if `url` is empty: the URL is the record's identity and
    /// a record without one could not be de-duplicated.
    ///
    /// Leading and trailing whitespace is stripped from every field. If the
    /// parser left `phone_number` blank it falls back to the mobile phone,
    /// then the home phone.
    pub fn new(url: impl Into<String>, mut fields: ProfileFields) -> Option<Self> {
        let url = url.into().trim().to_string();
        if url.is_empty() {
            return None;
        }

        for value in fields_mut(&mut fields) {
            let trimmed = value.trim();
            if trimmed.len() != value.len() {
                *value = trimmed.to_string();
            }
        }

        if fields.phone_number.is_empty() {
            fields.phone_number = if !fields.mobile_phone.is_empty() {
                fields.mobile_phone.clone()
            } else {
                fields.home_phone.clone()
            };
        }

        Some(Self { url, fields })
    }

    /// Builds a record from a table row in [`COLUMNS`] order
    ///
    /// Missing trailing cells are treated as empty. Returns `None` if the
    /// `url` cell is empty.
    pub fn from_row<'a, I>(row: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cells: Vec<&str> = row.into_iter().collect();
        cells.resize(COLUMNS.len(), "");

        let fields = ProfileFields {
            phone_number: cells[0].to_string(),
            name: cells[1].to_string(),
            position: cells[2].to_string(),
            mobile_phone: cells[3].to_string(),
            home_phone: cells[4].to_string(),
            email: cells[5].to_string(),
            gender: cells[6].to_string(),
            salary_expectation: cells[7].to_string(),
            skills: cells[8].to_string(),
            languages: cells[9].to_string(),
            education: cells[10].to_string(),
            work_history: cells[11].to_string(),
            about: cells[12].to_string(),
            desired_positions: cells[13].to_string(),
        };

        Self::new(cells[14], fields)
    }

    /// The profile URL this record was harvested from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The parsed profile fields
    pub fn fields(&self) -> &ProfileFields {
        &self.fields
    }

    /// Returns the value of a column by name, or `None` for an unknown column
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = COLUMNS.iter().position(|c| *c == column)?;
        Some(self.row()[index])
    }

    /// Returns the record as a table row in [`COLUMNS`] order
    pub fn row(&self) -> [&str; 15] {
        let f = &self.fields;
        [
            f.phone_number.as_str(),
            f.name.as_str(),
            f.position.as_str(),
            f.mobile_phone.as_str(),
            f.home_phone.as_str(),
            f.email.as_str(),
            f.gender.as_str(),
            f.salary_expectation.as_str(),
            f.skills.as_str(),
            f.languages.as_str(),
            f.education.as_str(),
            f.work_history.as_str(),
            f.about.as_str(),
            f.desired_positions.as_str(),
            self.url.as_str(),
        ]
    }
}

fn fields_mut(f: &mut ProfileFields) -> [&mut String; 14] {
    [
        &mut f.phone_number,
        &mut f.name,
        &mut f.position,
        &mut f.mobile_phone,
        &mut f.home_phone,
        &mut f.email,
        &mut f.gender,
        &mut f.salary_expectation,
        &mut f.skills,
        &mut f.languages,
        &mut f.education,
        &mut f.work_history,
        &mut f.about,
        &mut f.desired_positions,
    ]
}

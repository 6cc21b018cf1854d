use serde::{Deserialize, Serialize};

use crate::dates::{approx_ymd, make_approx_date, make_timestamp, parse_timestamp};

fn is_zero(n: &i64) -> bool {
    *n == 0
}

fn is_zero_f(n: &f64) -> bool {
    *n == 0.0
}

// ─── Sub-list items ────────────────────────────────────────

/// Structured personal name, or a literal (`value`) for organisations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub given: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub honourific: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lineage: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Name {
    /// Build a personal name from trimmed parts; `None` when every part is blank.
    pub fn person(honourific: &str, given: &str, family: &str, lineage: &str) -> Option<Self> {
        let name = Self {
            family: family.trim().to_string(),
            given: given.trim().to_string(),
            honourific: honourific.trim().to_string(),
            lineage: lineage.trim().to_string(),
            value: String::new(),
        };
        (!name.is_empty()).then_some(name)
    }

    pub fn literal(value: &str) -> Option<Self> {
        let value = value.trim();
        (!value.is_empty()).then(|| Self {
            value: value.to_string(),
            ..Self::default()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.family.is_empty()
            && self.given.is_empty()
            && self.honourific.is_empty()
            && self.lineage.is_empty()
            && self.value.is_empty()
    }

    /// Display form: `honourific given family lineage`, or the literal.
    pub fn display(&self) -> String {
        if !self.value.is_empty() {
            return self.value.clone();
        }
        [&self.honourific, &self.given, &self.family, &self.lineage]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One position in a sub-list. Which fields are populated depends on the list kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub pos: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub orcid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub show_email: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub item_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub agency: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub grant_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ror: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reported_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resolved_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Item {
    pub fn at(pos: i64) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    /// True when nothing but the position is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::at(self.pos)
    }

    pub fn family(&self) -> &str {
        self.name.as_ref().map(|n| n.family.as_str()).unwrap_or_default()
    }

    pub fn given(&self) -> &str {
        self.name.as_ref().map(|n| n.given.as_str()).unwrap_or_default()
    }

    /// Literal name, falling back to `value` for lists that keep names there.
    pub fn literal(&self) -> &str {
        match self.name.as_ref() {
            Some(n) if !n.value.is_empty() => &n.value,
            _ => &self.value,
        }
    }
}

/// Position-ordered sub-list. After assembly `items[i].pos == i` for every `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList {
    pub items: Vec<Item>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the list so `pos` is addressable, padding with empty entries.
    pub fn resize(&mut self, pos: usize) {
        while self.items.len() <= pos {
            let next = self.items.len() as i64;
            self.items.push(Item::at(next));
        }
    }

    pub fn at(&self, pos: usize) -> Option<&Item> {
        self.items.get(pos)
    }

    /// Entry at `pos`, growing the list first when needed.
    pub fn at_mut(&mut self, pos: usize) -> &mut Item {
        self.resize(pos);
        &mut self.items[pos]
    }

    /// Append at the next position.
    pub fn push(&mut self, mut item: Item) {
        item.pos = self.items.len() as i64;
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Non-empty `value` strings in order.
    pub fn values(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| !i.value.is_empty())
            .map(|i| i.value.clone())
            .collect()
    }

    /// Re-number positions after entries were appended out of order.
    pub fn renumber(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.pos = i as i64;
        }
    }
}

impl FromIterator<Item> for ItemList {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.push(item);
        }
        list
    }
}

/// Every position-ordered sub-list a legacy record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubList {
    Creators,
    Editors,
    Contributors,
    Exhibitors,
    Producers,
    Conductors,
    Lyricists,
    ThesisAdvisor,
    ThesisCommittee,
    ConfCreators,
    CorpCreators,
    CorpContributors,
    Funders,
    RelatedUrl,
    OtherNumberingSystem,
    ItemIssues,
    LocalGroup,
    ReferenceText,
    Projects,
    Subjects,
    Accompaniment,
    SkillAreas,
    CopyrightHolders,
    Reference,
    AltTitle,
    PatentAssignee,
    RelatedPatents,
    Divisions,
    OptionMajor,
    OptionMinor,
}

impl SubList {
    pub const ALL: [SubList; 30] = [
        SubList::Creators,
        SubList::Editors,
        SubList::Contributors,
        SubList::Exhibitors,
        SubList::Producers,
        SubList::Conductors,
        SubList::Lyricists,
        SubList::ThesisAdvisor,
        SubList::ThesisCommittee,
        SubList::ConfCreators,
        SubList::CorpCreators,
        SubList::CorpContributors,
        SubList::Funders,
        SubList::RelatedUrl,
        SubList::OtherNumberingSystem,
        SubList::ItemIssues,
        SubList::LocalGroup,
        SubList::ReferenceText,
        SubList::Projects,
        SubList::Subjects,
        SubList::Accompaniment,
        SubList::SkillAreas,
        SubList::CopyrightHolders,
        SubList::Reference,
        SubList::AltTitle,
        SubList::PatentAssignee,
        SubList::RelatedPatents,
        SubList::Divisions,
        SubList::OptionMajor,
        SubList::OptionMinor,
    ];

    /// Field name shared by the record JSON and the side-table column prefix.
    pub fn field(self) -> &'static str {
        match self {
            SubList::Creators => "creators",
            SubList::Editors => "editors",
            SubList::Contributors => "contributors",
            SubList::Exhibitors => "exhibitors",
            SubList::Producers => "producers",
            SubList::Conductors => "conductors",
            SubList::Lyricists => "lyricists",
            SubList::ThesisAdvisor => "thesis_advisor",
            SubList::ThesisCommittee => "thesis_committee",
            SubList::ConfCreators => "conf_creators",
            SubList::CorpCreators => "corp_creators",
            SubList::CorpContributors => "corp_contributors",
            SubList::Funders => "funders",
            SubList::RelatedUrl => "related_url",
            SubList::OtherNumberingSystem => "other_numbering_system",
            SubList::ItemIssues => "item_issues",
            SubList::LocalGroup => "local_group",
            SubList::ReferenceText => "referencetext",
            SubList::Projects => "projects",
            SubList::Subjects => "subjects",
            SubList::Accompaniment => "accompaniment",
            SubList::SkillAreas => "skill_areas",
            SubList::CopyrightHolders => "copyright_holders",
            SubList::Reference => "reference",
            SubList::AltTitle => "alt_title",
            SubList::PatentAssignee => "patent_assignee",
            SubList::RelatedPatents => "related_patents",
            SubList::Divisions => "divisions",
            SubList::OptionMajor => "option_major",
            SubList::OptionMinor => "option_minor",
        }
    }

    /// Lists whose entries carry structured personal names.
    pub fn is_person_list(self) -> bool {
        matches!(
            self,
            SubList::Creators
                | SubList::Editors
                | SubList::Contributors
                | SubList::Exhibitors
                | SubList::Producers
                | SubList::Conductors
                | SubList::Lyricists
                | SubList::ThesisAdvisor
                | SubList::ThesisCommittee
        )
    }
}

// ─── Documents and files ───────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyFile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub fileid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub datasetid: String,
    pub objectid: i64,
    pub filename: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash_type: String,
    pub filesize: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mtime: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(skip)]
    pub mtime_year: i64,
    #[serde(skip)]
    pub mtime_month: i64,
    #[serde(skip)]
    pub mtime_day: i64,
    #[serde(skip)]
    pub mtime_hour: i64,
    #[serde(skip)]
    pub mtime_minute: i64,
    #[serde(skip)]
    pub mtime_second: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub docid: i64,
    pub eprintid: i64,
    pub pos: i64,
    pub rev_number: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formatdesc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub security: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub main: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub placement: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_duration: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_audio_codec: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_video_codec: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub media_width: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub media_height: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_aspect_ratio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_sample_start: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_sample_stop: String,
    /// Embargo end as a partial date.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date_embargo: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<LegacyFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relation: Vec<Relation>,

    #[serde(skip)]
    pub date_embargo_year: i64,
    #[serde(skip)]
    pub date_embargo_month: i64,
    #[serde(skip)]
    pub date_embargo_day: i64,
}

impl Document {
    pub fn derive_dates(&mut self) {
        self.date_embargo = make_approx_date(
            self.date_embargo_year,
            self.date_embargo_month,
            self.date_embargo_day,
        );
    }
}

impl LegacyFile {
    pub fn derive_dates(&mut self) {
        self.mtime = make_timestamp(
            self.mtime_year,
            self.mtime_month,
            self.mtime_day,
            self.mtime_hour,
            self.mtime_minute,
            self.mtime_second,
        );
    }
}

// ─── Record ────────────────────────────────────────────────

/// One legacy (EPrints-style) record assembled from the relational tables.
///
/// Split date columns are kept beside their string forms; the strings are
/// authoritative and [`LegacyRecord::split_dates`] rewrites the components
/// from them before a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyRecord {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub eprintid: i64,
    pub rev_number: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub eprint_status: String,
    pub userid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub datestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lastmod: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status_changed: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub record_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub metadata_visibility: String,

    // Descriptive
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ispublished: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub full_text_status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(rename = "abstract", skip_serializing_if = "String::is_empty")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub series: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub volume: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publication: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub place_of_pub: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pagerange: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub pages: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_location: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_dates: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refereed: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub isbn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub book_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub official_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alt_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rights: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collection: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reviewer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub official_cit: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub monograph_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suggestions: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pres_type: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub succeeds: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub commentary: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contact_email: String,
    #[serde(skip_serializing_if = "is_zero_f")]
    pub latitude: f64,
    #[serde(skip_serializing_if = "is_zero_f")]
    pub longitude: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub department: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_media: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub num_pieces: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub composition_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pedagogic_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub learning_level: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completion_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub task_purpose: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doi: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pmc_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pmid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_url: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub toc: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub interviewer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub interviewdate: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nonsubj_keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub season: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub classification_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patent_applicant: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patent_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patent_classification: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub institution: String,

    // Thesis
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree_grantor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_submitted_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_defense_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_approved_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_public_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_author_email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hide_thesis_author_email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gradofc_approval_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_awards: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub review_status: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub copyright_statement: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub replacedby: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub item_issues_count: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub errata: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub coverage_dates: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,

    /// Display name of the depositing user.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub deposited_by: String,

    // ─── Sub-lists ───
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creators: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editors: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhibitors: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producers: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conductors: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyricists: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thesis_advisor: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thesis_committee: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf_creators: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corp_creators: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corp_contributors: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funders: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_url: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_numbering_system: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_issues: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_group: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencetext: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accompaniment: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_areas: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright_holders: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_title: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patent_assignee: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_patents: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divisions: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_major: Option<ItemList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_minor: Option<ItemList>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,

    // ─── Split date columns ───
    #[serde(skip)]
    pub datestamp_year: i64,
    #[serde(skip)]
    pub datestamp_month: i64,
    #[serde(skip)]
    pub datestamp_day: i64,
    #[serde(skip)]
    pub datestamp_hour: i64,
    #[serde(skip)]
    pub datestamp_minute: i64,
    #[serde(skip)]
    pub datestamp_second: i64,
    #[serde(skip)]
    pub lastmod_year: i64,
    #[serde(skip)]
    pub lastmod_month: i64,
    #[serde(skip)]
    pub lastmod_day: i64,
    #[serde(skip)]
    pub lastmod_hour: i64,
    #[serde(skip)]
    pub lastmod_minute: i64,
    #[serde(skip)]
    pub lastmod_second: i64,
    #[serde(skip)]
    pub status_changed_year: i64,
    #[serde(skip)]
    pub status_changed_month: i64,
    #[serde(skip)]
    pub status_changed_day: i64,
    #[serde(skip)]
    pub status_changed_hour: i64,
    #[serde(skip)]
    pub status_changed_minute: i64,
    #[serde(skip)]
    pub status_changed_second: i64,
    #[serde(skip)]
    pub date_year: i64,
    #[serde(skip)]
    pub date_month: i64,
    #[serde(skip)]
    pub date_day: i64,
    #[serde(skip)]
    pub thesis_degree_date_year: i64,
    #[serde(skip)]
    pub thesis_degree_date_month: i64,
    #[serde(skip)]
    pub thesis_degree_date_day: i64,
    #[serde(skip)]
    pub thesis_submitted_date_year: i64,
    #[serde(skip)]
    pub thesis_submitted_date_month: i64,
    #[serde(skip)]
    pub thesis_submitted_date_day: i64,
    #[serde(skip)]
    pub thesis_defense_date_year: i64,
    #[serde(skip)]
    pub thesis_defense_date_month: i64,
    #[serde(skip)]
    pub thesis_defense_date_day: i64,
    #[serde(skip)]
    pub thesis_approved_date_year: i64,
    #[serde(skip)]
    pub thesis_approved_date_month: i64,
    #[serde(skip)]
    pub thesis_approved_date_day: i64,
    #[serde(skip)]
    pub thesis_public_date_year: i64,
    #[serde(skip)]
    pub thesis_public_date_month: i64,
    #[serde(skip)]
    pub thesis_public_date_day: i64,
    #[serde(skip)]
    pub gradofc_approval_date_year: i64,
    #[serde(skip)]
    pub gradofc_approval_date_month: i64,
    #[serde(skip)]
    pub gradofc_approval_date_day: i64,
}

/// Review states that keep a record out of public view.
pub const WITHHELD_REVIEW_STATUS: [&str; 4] = ["review", "withheld", "gradoffice", "notapproved"];

impl LegacyRecord {
    /// `archive` status with `show` visibility.
    pub fn is_public(&self) -> bool {
        self.eprint_status == "archive" && self.metadata_visibility == "show"
    }

    pub fn sublist(&self, kind: SubList) -> Option<&ItemList> {
        self.sublist_slot(kind).as_ref()
    }

    pub fn sublist_mut(&mut self, kind: SubList) -> &mut Option<ItemList> {
        match kind {
            SubList::Creators => &mut self.creators,
            SubList::Editors => &mut self.editors,
            SubList::Contributors => &mut self.contributors,
            SubList::Exhibitors => &mut self.exhibitors,
            SubList::Producers => &mut self.producers,
            SubList::Conductors => &mut self.conductors,
            SubList::Lyricists => &mut self.lyricists,
            SubList::ThesisAdvisor => &mut self.thesis_advisor,
            SubList::ThesisCommittee => &mut self.thesis_committee,
            SubList::ConfCreators => &mut self.conf_creators,
            SubList::CorpCreators => &mut self.corp_creators,
            SubList::CorpContributors => &mut self.corp_contributors,
            SubList::Funders => &mut self.funders,
            SubList::RelatedUrl => &mut self.related_url,
            SubList::OtherNumberingSystem => &mut self.other_numbering_system,
            SubList::ItemIssues => &mut self.item_issues,
            SubList::LocalGroup => &mut self.local_group,
            SubList::ReferenceText => &mut self.referencetext,
            SubList::Projects => &mut self.projects,
            SubList::Subjects => &mut self.subjects,
            SubList::Accompaniment => &mut self.accompaniment,
            SubList::SkillAreas => &mut self.skill_areas,
            SubList::CopyrightHolders => &mut self.copyright_holders,
            SubList::Reference => &mut self.reference,
            SubList::AltTitle => &mut self.alt_title,
            SubList::PatentAssignee => &mut self.patent_assignee,
            SubList::RelatedPatents => &mut self.related_patents,
            SubList::Divisions => &mut self.divisions,
            SubList::OptionMajor => &mut self.option_major,
            SubList::OptionMinor => &mut self.option_minor,
        }
    }

    fn sublist_slot(&self, kind: SubList) -> &Option<ItemList> {
        match kind {
            SubList::Creators => &self.creators,
            SubList::Editors => &self.editors,
            SubList::Contributors => &self.contributors,
            SubList::Exhibitors => &self.exhibitors,
            SubList::Producers => &self.producers,
            SubList::Conductors => &self.conductors,
            SubList::Lyricists => &self.lyricists,
            SubList::ThesisAdvisor => &self.thesis_advisor,
            SubList::ThesisCommittee => &self.thesis_committee,
            SubList::ConfCreators => &self.conf_creators,
            SubList::CorpCreators => &self.corp_creators,
            SubList::CorpContributors => &self.corp_contributors,
            SubList::Funders => &self.funders,
            SubList::RelatedUrl => &self.related_url,
            SubList::OtherNumberingSystem => &self.other_numbering_system,
            SubList::ItemIssues => &self.item_issues,
            SubList::LocalGroup => &self.local_group,
            SubList::ReferenceText => &self.referencetext,
            SubList::Projects => &self.projects,
            SubList::Subjects => &self.subjects,
            SubList::Accompaniment => &self.accompaniment,
            SubList::SkillAreas => &self.skill_areas,
            SubList::CopyrightHolders => &self.copyright_holders,
            SubList::Reference => &self.reference,
            SubList::AltTitle => &self.alt_title,
            SubList::PatentAssignee => &self.patent_assignee,
            SubList::RelatedPatents => &self.related_patents,
            SubList::Divisions => &self.divisions,
            SubList::OptionMajor => &self.option_major,
            SubList::OptionMinor => &self.option_minor,
        }
    }

    /// Sub-list entries, empty when the list is absent.
    pub fn items(&self, kind: SubList) -> &[Item] {
        self.sublist(kind).map(|l| l.items.as_slice()).unwrap_or_default()
    }

    /// Entry at `pos` in `kind`, creating the list and padding it as needed.
    pub fn item_at_mut(&mut self, kind: SubList, pos: usize) -> &mut Item {
        self.sublist_mut(kind).get_or_insert_with(ItemList::new).at_mut(pos)
    }

    /// Rebuild the string dates from their split components.
    pub fn derive_dates(&mut self) {
        self.datestamp = make_timestamp(
            self.datestamp_year,
            self.datestamp_month,
            self.datestamp_day,
            self.datestamp_hour,
            self.datestamp_minute,
            self.datestamp_second,
        );
        self.lastmod = make_timestamp(
            self.lastmod_year,
            self.lastmod_month,
            self.lastmod_day,
            self.lastmod_hour,
            self.lastmod_minute,
            self.lastmod_second,
        );
        self.status_changed = make_timestamp(
            self.status_changed_year,
            self.status_changed_month,
            self.status_changed_day,
            self.status_changed_hour,
            self.status_changed_minute,
            self.status_changed_second,
        );
        self.date = make_approx_date(self.date_year, self.date_month, self.date_day);
        self.thesis_degree_date = make_approx_date(
            self.thesis_degree_date_year,
            self.thesis_degree_date_month,
            self.thesis_degree_date_day,
        );
        self.thesis_submitted_date = make_approx_date(
            self.thesis_submitted_date_year,
            self.thesis_submitted_date_month,
            self.thesis_submitted_date_day,
        );
        self.thesis_defense_date = make_approx_date(
            self.thesis_defense_date_year,
            self.thesis_defense_date_month,
            self.thesis_defense_date_day,
        );
        self.thesis_approved_date = make_approx_date(
            self.thesis_approved_date_year,
            self.thesis_approved_date_month,
            self.thesis_approved_date_day,
        );
        self.thesis_public_date = make_approx_date(
            self.thesis_public_date_year,
            self.thesis_public_date_month,
            self.thesis_public_date_day,
        );
        self.gradofc_approval_date = make_approx_date(
            self.gradofc_approval_date_year,
            self.gradofc_approval_date_month,
            self.gradofc_approval_date_day,
        );
    }

    /// Rewrite the split components from the (authoritative) string dates.
    pub fn split_dates(&mut self) {
        (
            self.datestamp_year,
            self.datestamp_month,
            self.datestamp_day,
            self.datestamp_hour,
            self.datestamp_minute,
            self.datestamp_second,
        ) = parse_timestamp(&self.datestamp);
        (
            self.lastmod_year,
            self.lastmod_month,
            self.lastmod_day,
            self.lastmod_hour,
            self.lastmod_minute,
            self.lastmod_second,
        ) = parse_timestamp(&self.lastmod);
        (
            self.status_changed_year,
            self.status_changed_month,
            self.status_changed_day,
            self.status_changed_hour,
            self.status_changed_minute,
            self.status_changed_second,
        ) = parse_timestamp(&self.status_changed);
        (self.date_year, self.date_month, self.date_day) = approx_ymd(&self.date);
        (
            self.thesis_degree_date_year,
            self.thesis_degree_date_month,
            self.thesis_degree_date_day,
        ) = approx_ymd(&self.thesis_degree_date);
        (
            self.thesis_submitted_date_year,
            self.thesis_submitted_date_month,
            self.thesis_submitted_date_day,
        ) = approx_ymd(&self.thesis_submitted_date);
        (
            self.thesis_defense_date_year,
            self.thesis_defense_date_month,
            self.thesis_defense_date_day,
        ) = approx_ymd(&self.thesis_defense_date);
        (
            self.thesis_approved_date_year,
            self.thesis_approved_date_month,
            self.thesis_approved_date_day,
        ) = approx_ymd(&self.thesis_approved_date);
        (
            self.thesis_public_date_year,
            self.thesis_public_date_month,
            self.thesis_public_date_day,
        ) = approx_ymd(&self.thesis_public_date);
        (
            self.gradofc_approval_date_year,
            self.gradofc_approval_date_month,
            self.gradofc_approval_date_day,
        ) = approx_ymd(&self.gradofc_approval_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_pads_with_positioned_entries() {
        let mut list = ItemList::new();
        list.at_mut(4).value = "five".into();
        assert_eq!(list.len(), 5);
        for (i, item) in list.iter().enumerate() {
            assert_eq!(item.pos, i as i64);
        }
        assert!(list.at(3).is_some_and(Item::is_empty));
    }

    #[test]
    fn person_name_requires_a_part() {
        assert!(Name::person(" ", "", "", "").is_none());
        let name = Name::person("Dr.", " Jane ", "Doe", "").unwrap();
        assert_eq!(name.given, "Jane");
        assert_eq!(name.display(), "Dr. Jane Doe");
    }

    #[test]
    fn public_needs_archive_and_show() {
        let mut rec = LegacyRecord {
            eprint_status: "archive".into(),
            metadata_visibility: "show".into(),
            ..LegacyRecord::default()
        };
        assert!(rec.is_public());
        rec.metadata_visibility = "no_search".into();
        assert!(!rec.is_public());
        rec.metadata_visibility = "show".into();
        rec.eprint_status = "buffer".into();
        assert!(!rec.is_public());
    }

    #[test]
    fn dates_reconcile_in_both_directions() {
        let mut rec = LegacyRecord {
            datestamp: "2020-01-02 03:04:05".into(),
            date: "2019-07".into(),
            ..LegacyRecord::default()
        };
        rec.split_dates();
        assert_eq!((rec.date_year, rec.date_month, rec.date_day), (2019, 7, 0));
        rec.datestamp.clear();
        rec.date.clear();
        rec.derive_dates();
        assert_eq!(rec.datestamp, "2020-01-02 03:04:05");
        assert_eq!(rec.date, "2019-07");
    }

    #[test]
    fn sublist_access_by_kind() {
        let mut rec = LegacyRecord::default();
        rec.item_at_mut(SubList::Funders, 1).agency = "NSF".into();
        assert_eq!(rec.items(SubList::Funders).len(), 2);
        assert_eq!(rec.items(SubList::Funders)[1].agency, "NSF");
        assert!(rec.items(SubList::Creators).is_empty());
    }

    #[test]
    fn json_uses_legacy_field_names() {
        let mut rec = LegacyRecord {
            eprintid: 7,
            record_type: "article".into(),
            abstract_text: "Text".into(),
            ..LegacyRecord::default()
        };
        rec.item_at_mut(SubList::Creators, 0).name = Name::person("", "Jane", "Doe", "");
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["type"], "article");
        assert_eq!(v["abstract"], "Text");
        assert_eq!(v["creators"][0]["name"]["family"], "Doe");
        assert!(v.get("datestamp_year").is_none());
    }
}

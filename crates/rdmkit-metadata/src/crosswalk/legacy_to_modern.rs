use std::collections::HashSet;

use chrono::NaiveDateTime;
use rdmkit_core::dates::normalize_date;
use rdmkit_core::models::{
    Award, Creator, Description, Document, Embargo, FileEntry, Files, Funder, Funding,
    Item, LangMap, LegacyRecord, ModernRecord, Owner, Parent, ParentAccess, PersonOrOrg,
    RecordAccess, RelatedIdentifier, Right, SubList, Subject, TitleDetail, Tombstone, TypeRef,
    WITHHELD_REVIEW_STATUS,
};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{CrosswalkContext, Crosswalked};
use crate::error::{MetadataError, Result};
use crate::vocab::map_identifier_scheme;

/// Files never carried over: derived previews and index dumps.
const SKIPPED_FILES: [&str; 2] = ["indexcodes.txt", "preview.png"];
const SKIPPED_FORMAT_PREFIXES: [&str; 2] = ["Generate", "Thumbnail"];

fn en(text: &str) -> LangMap {
    LangMap::from([("en".to_string(), text.to_string())])
}

/// `2020-01-02 03:04:05` → `2020-01-02T03:04:05+00:00`; anything else is kept.
fn rdm_timestamp(s: &str) -> String {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.and_utc().to_rfc3339())
        .unwrap_or_else(|_| s.to_string())
}

/// Split a PMCID field on `,` or `;`, upper-casing each part.
pub fn normalize_pmcids(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Sub-list entry to a person or organization; empty positions give `None`.
fn person_or_org(item: &Item) -> Option<PersonOrOrg> {
    let mut p = if !item.family().is_empty() || !item.given().is_empty() {
        let mut p = PersonOrOrg::person(item.family(), item.given());
        if !item.id.is_empty() {
            p.identifiers.push(identifier(&map_identifier_scheme("id"), &item.id));
        }
        if !item.orcid.is_empty() {
            p.identifiers.push(identifier("orcid", &item.orcid));
        }
        p
    } else if !item.literal().is_empty() {
        PersonOrOrg::organization(item.literal())
    } else {
        return None;
    };
    if !item.ror.is_empty() {
        p.identifiers.push(identifier("ror", &item.ror));
    }
    Some(p)
}

fn identifier(scheme: &str, value: &str) -> rdmkit_core::models::Identifier {
    rdmkit_core::models::Identifier::new(scheme, value.trim())
}

fn creators_from(rec: &LegacyRecord, kind: SubList, role: Option<&str>) -> Vec<Creator> {
    rec.items(kind)
        .iter()
        .filter_map(|item| person_or_org(item).map(|p| Creator::new(p, role)))
        .collect()
}

fn is_public(rec: &LegacyRecord) -> bool {
    rec.is_public() && !WITHHELD_REVIEW_STATUS.contains(&rec.review_status.as_str())
}

fn document_security(doc: &Document) -> &str {
    if doc.security == "staffonly" { "internal" } else { doc.security.as_str() }
}

fn record_access(rec: &LegacyRecord) -> RecordAccess {
    let mut access = RecordAccess::default();
    let public = is_public(rec);
    if public {
        access.record = "public".to_string();
    }

    let embargoes: Vec<Embargo> = rec
        .documents
        .iter()
        .filter(|d| !d.date_embargo.is_empty())
        .map(|d| Embargo {
            active: document_security(d) == "internal",
            until: d.date_embargo.clone(),
            reason: rec.suggestions.clone(),
        })
        .collect();
    let earliest = |active: bool| {
        embargoes
            .iter()
            .filter(|e| e.active == active)
            .min_by(|a, b| a.until.cmp(&b.until))
            .cloned()
    };
    access.embargo = earliest(true).or_else(|| earliest(false));

    let files_open = !rec.documents.is_empty()
        && rec.documents.iter().all(|d| document_security(d) == "public");
    let embargoed = access.embargo.as_ref().is_some_and(|e| e.active);
    if public && files_open && !embargoed {
        access.files = "public".to_string();
    }
    access
}

fn keep_file(filename: &str, doc: &Document) -> bool {
    !SKIPPED_FILES.contains(&filename)
        && !SKIPPED_FORMAT_PREFIXES.iter().any(|p| doc.formatdesc.starts_with(p))
}

fn files(rec: &LegacyRecord) -> Option<Files> {
    let mut files = Files {
        enabled: true,
        ..Files::default()
    };
    for doc in &rec.documents {
        for f in doc.files.iter().filter(|f| keep_file(&f.filename, doc)) {
            let mut metadata = Map::new();
            metadata.insert("security".into(), json!(document_security(doc)));
            metadata.insert("format".into(), json!(doc.format));
            metadata.insert("format_desc".into(), json!(doc.formatdesc));
            metadata.insert("rev_number".into(), json!(doc.rev_number));
            metadata.insert("pos".into(), json!(doc.pos));
            metadata.insert("main".into(), json!(doc.main));
            metadata.insert("content".into(), json!(doc.content));
            metadata.insert("file_id".into(), json!(f.fileid));
            metadata.insert("object_id".into(), json!(f.objectid));
            if !f.url.is_empty() {
                metadata.insert("url".into(), json!(f.url));
            }
            let checksum = if f.hash.is_empty() {
                String::new()
            } else {
                format!("{}:{}", f.hash_type.to_lowercase(), f.hash)
            };
            if f.filename.starts_with("preview") {
                files.default_preview = f.filename.clone();
            }
            if !files.entries.contains_key(&f.filename) {
                files.order.push(f.filename.clone());
            }
            files.entries.insert(
                f.filename.clone(),
                FileEntry {
                    key: f.filename.clone(),
                    size: Some(f.filesize),
                    mimetype: f.mime_type.clone(),
                    checksum,
                    metadata,
                },
            );
        }
    }
    (!files.entries.is_empty()).then_some(files)
}

fn rights(rec: &LegacyRecord) -> Vec<Right> {
    let note = rec.note.to_lowercase();
    let note_is_rights =
        rec.note.contains('©') || note.contains("copyright") || note.contains("(c)");
    [
        rec.rights.as_str(),
        if note_is_rights { rec.note.as_str() } else { "" },
        rec.copyright_statement.as_str(),
    ]
    .into_iter()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| Right {
        title: en("Other"),
        description: en(s),
        ..Right::default()
    })
    .collect()
}

fn subjects(rec: &LegacyRecord) -> Vec<Subject> {
    let mut seen = HashSet::new();
    rec.keywords
        .split(';')
        .map(str::to_string)
        .chain(rec.items(SubList::Subjects).iter().map(|i| i.value.clone()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "cls")
        .filter(|s| seen.insert(s.clone()))
        .map(|subject| Subject {
            id: String::new(),
            subject,
        })
        .collect()
}

fn related(identifier: &str, scheme: &str, relation: &str) -> RelatedIdentifier {
    RelatedIdentifier {
        identifier: identifier.to_string(),
        scheme: scheme.to_string(),
        relation_type: TypeRef::new(relation),
        resource_type: None,
    }
}

fn normalize_thesis_type(s: &str) -> String {
    if s == "phd" {
        return "PhD".to_string();
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn non_empty(map: Vec<(&str, &str)>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

fn custom_fields(rec: &LegacyRecord) -> Map<String, Value> {
    let mut out = Map::new();

    if rec.record_type == "article" && !rec.publication.is_empty() {
        out.insert(
            "journal:journal".into(),
            Value::Object(non_empty(vec![
                ("title", &rec.publication),
                ("issue", &rec.number),
                ("pages", &rec.pagerange),
                ("volume", &rec.volume),
                ("series", &rec.series),
                ("issn", &rec.issn),
            ])),
        );
    }
    if !rec.isbn.is_empty() {
        out.insert(
            "imprint:imprint".into(),
            Value::Object(non_empty(vec![
                ("isbn", &rec.isbn),
                ("title", &rec.book_title),
                ("pages", &rec.pagerange),
                ("place", &rec.place_of_pub),
                ("series", &rec.series),
            ])),
        );
    } else {
        if !rec.series.is_empty() {
            out.insert("caltech:series".into(), json!(rec.series));
        }
        if !rec.place_of_pub.is_empty() {
            out.insert("caltech:place_of_publication".into(), json!(rec.place_of_pub));
        }
    }
    if rec.record_type == "thesis" {
        out.insert(
            "thesis:thesis".into(),
            json!({
                "type": normalize_thesis_type(&rec.thesis_type),
                "university": rec.institution,
                "department": rec.department,
            }),
        );
    }

    let mut seen = HashSet::new();
    let groups: Vec<Value> = rec
        .items(SubList::LocalGroup)
        .iter()
        .map(|i| i.value.trim().replace(' ', "-"))
        .filter(|g| !g.is_empty() && seen.insert(g.clone()))
        .map(|id| json!({ "id": id }))
        .collect();
    if !groups.is_empty() {
        out.insert("caltech:groups".into(), Value::Array(groups));
    }

    let meeting = non_empty(vec![
        ("type", &rec.event_type),
        ("title", &rec.event_title),
        ("place", &rec.event_location),
        ("dates", &rec.event_dates),
    ]);
    if !meeting.is_empty() {
        out.insert("meeting:meeting".into(), Value::Object(meeting));
    }
    if !rec.suggestions.is_empty() {
        out.insert("caltech:internal_note".into(), json!(rec.suggestions));
    }
    if let Some(other) = rec
        .items(SubList::OtherNumberingSystem)
        .iter()
        .find(|i| !i.literal().is_empty() || !i.id.is_empty())
    {
        if !other.literal().is_empty() {
            out.insert("caltech:other_num_name".into(), json!(other.literal()));
        }
        if !other.id.is_empty() {
            out.insert("caltech:other_num_id".into(), json!(other.id));
        }
    }
    out
}

fn tombstone(rec: &LegacyRecord, id: String) -> ModernRecord {
    ModernRecord {
        id,
        tombstone: Some(Tombstone {
            removed_by: Some(Owner {
                user: rec.userid,
                display_name: rec.reviewer.clone(),
            }),
            reason: rec.suggestions.clone(),
            is_visible: true,
            ..Tombstone::default()
        }),
        created: rdm_timestamp(&rec.datestamp),
        updated: rdm_timestamp(&rec.lastmod),
        ..ModernRecord::default()
    }
}

/// Translate a reconstructed legacy record into a Modern Repo record.
///
/// The id is `<collection>:<eprintid>`; a record without an eprint id cannot be
/// identified and is rejected.
pub fn legacy_to_modern(rec: &LegacyRecord, ctx: &CrosswalkContext) -> Result<Crosswalked<ModernRecord>> {
    if rec.eprintid <= 0 {
        return Err(MetadataError::Crosswalk("legacy record has no eprintid".to_string()));
    }
    let collection = if rec.collection.is_empty() { ctx.collection.as_str() } else { rec.collection.as_str() };
    let id = format!("{collection}:{}", rec.eprintid);
    let mut warnings = Vec::new();

    if rec.eprint_status == "deletion" {
        debug!(eprintid = rec.eprintid, "deleted record, tombstone only");
        return Ok(Crosswalked::new(tombstone(rec, id), warnings));
    }

    let mut out = ModernRecord {
        id: id.clone(),
        record_access: record_access(rec),
        files: files(rec),
        created: rdm_timestamp(&rec.datestamp),
        updated: rdm_timestamp(&rec.lastmod),
        custom_fields: custom_fields(rec),
        ..ModernRecord::default()
    };
    if rec.userid > 0 {
        out.parent = Some(Parent {
            id,
            access: Some(ParentAccess {
                owned_by: vec![Owner {
                    user: rec.userid,
                    display_name: rec.deposited_by.clone(),
                }],
            }),
        });
    }

    out.set_pid("doi", &rec.doi, "datacite");
    out.set_pid("issn", &rec.issn, "");
    out.set_pid("isbn", &rec.isbn, "");

    let vocab = &ctx.vocab;
    let md = &mut out.metadata;
    if rec.record_type.is_empty() {
        warnings.push("record has no type".to_string());
    }
    md.resource_type = TypeRef::new(vocab.map_resource_type(&rec.record_type));

    md.title = rec.title.trim().to_string();
    if md.title.is_empty() {
        warnings.push("record has no title".to_string());
    }
    md.additional_titles = rec
        .items(SubList::AltTitle)
        .iter()
        .filter(|i| !i.value.trim().is_empty())
        .map(|i| TitleDetail {
            title: i.value.trim().to_string(),
            title_type: TypeRef::new("alternative-title"),
            lang: None,
        })
        .collect();

    // Creators, with editors promoted when nobody else is credited.
    let mut creators = creators_from(rec, SubList::Creators, None);
    creators.extend(creators_from(rec, SubList::CorpCreators, None));
    let editors_promoted = creators.is_empty() && !rec.items(SubList::Editors).is_empty();
    if editors_promoted {
        creators = creators_from(rec, SubList::Editors, Some("editor"));
    }
    md.creators = creators;

    let mut contributors: Vec<Creator> = rec
        .items(SubList::Contributors)
        .iter()
        .filter_map(|item| {
            let role = vocab.map_contributor_role(&item.role);
            person_or_org(item).map(|p| Creator::new(p, Some(&role)))
        })
        .collect();
    contributors.extend(creators_from(rec, SubList::CorpContributors, Some("contributor")));
    if !editors_promoted {
        contributors.extend(creators_from(rec, SubList::Editors, Some("editor")));
    }
    contributors.extend(creators_from(rec, SubList::ThesisAdvisor, Some("thesis_advisor")));
    contributors.extend(creators_from(rec, SubList::ThesisCommittee, Some("thesis_committee")));
    md.contributors = contributors;

    md.description = rec.abstract_text.trim().to_string();
    for (text, kind) in [(&rec.note, "additional"), (&rec.errata, "errata")] {
        if !text.trim().is_empty() {
            md.additional_descriptions.push(Description {
                description: text.trim().to_string(),
                description_type: TypeRef::new(kind),
                lang: None,
            });
        }
    }
    md.rights = rights(rec);

    // Dates
    let published = rec.date_type.is_empty() || rec.date_type == "published";
    md.publication_date = if published && !rec.date.is_empty() {
        normalize_date(&rec.date)
    } else {
        normalize_date(&rec.datestamp)
    };
    if md.publication_date.is_empty() {
        warnings.push("no publication date".to_string());
    }
    let ten = |s: &str| s.chars().take(10).collect::<String>();
    if published && !rec.date.is_empty() {
        md.add_date(&ten(&rec.date), "pub_date", "Publication date");
    }
    if !rec.date_type.is_empty() && !rec.date.is_empty() {
        md.add_date(&ten(&rec.date), &rec.date_type, "Created from date_type and date");
    }
    md.add_date(&ten(&rec.datestamp), "created", "Deposit datestamp");
    md.add_date(&ten(&rec.lastmod), "updated", "Last modified");

    md.publisher = if rec.publisher.is_empty() { rec.publication.clone() } else { rec.publisher.clone() };

    md.add_identifier("eprintid", &rec.eprintid.to_string());
    md.add_identifier("doi", &rec.doi);
    md.add_identifier("resolverid", &rec.id_number);
    for pmcid in normalize_pmcids(&rec.pmc_id) {
        md.add_identifier("pmcid", &pmcid);
    }

    for item in rec.items(SubList::RelatedUrl) {
        let value = if item.value.trim().is_empty() { item.url.trim() } else { item.value.trim() };
        if value.is_empty() {
            continue;
        }
        match item.item_type.trim() {
            "doi" => md.related_identifiers.push(related(value, "doi", "describes")),
            "pub" => md.related_identifiers.push(related(value, "url", "ispublishedin")),
            kind @ ("pmcid" | "eprintid" | "resolverid") => md.add_identifier(kind, value),
            "pmc" => {}
            _ => md.related_identifiers.push(related(value, "url", "describes")),
        }
    }

    md.funding = rec
        .items(SubList::Funders)
        .iter()
        .filter(|i| !i.agency.trim().is_empty())
        .map(|i| Funding {
            funder: Funder {
                id: i.ror.trim().to_string(),
                name: i.agency.trim().to_string(),
                scheme: String::new(),
            },
            award: (!i.grant_number.trim().is_empty()).then(|| Award {
                number: i.grant_number.trim().to_string(),
                ..Award::default()
            }),
        })
        .collect();

    md.subjects = subjects(rec);
    let language = if rec.language.is_empty() { "eng" } else { rec.language.as_str() };
    md.languages = vec![TypeRef::new(language)];

    debug!(eprintid = rec.eprintid, warnings = warnings.len(), "legacy record crosswalked");
    Ok(Crosswalked::new(out, warnings))
}

#[cfg(test)]
mod tests {
    use rdmkit_core::models::{LegacyFile, Name};
    use rdmkit_core::storage::legacy::fixtures::seeded_db;

    use super::*;

    fn ctx() -> CrosswalkContext {
        CrosswalkContext {
            collection: "CaltechAUTHORS".to_string(),
            ..CrosswalkContext::default()
        }
    }

    #[test]
    fn seeded_record_crosswalks() {
        let db = seeded_db().unwrap();
        let legacy = db.read_record(1).unwrap();
        let out = legacy_to_modern(&legacy, &ctx()).unwrap();
        let rec = out.record;

        assert_eq!(rec.id, "CaltechAUTHORS:1");
        assert_eq!(rec.pid("doi"), Some("10.1/x"));
        assert_eq!(rec.external_pids["doi"].provider, "datacite");
        assert_eq!(rec.pid("issn"), Some("1234-5678"));
        assert_eq!(rec.record_access.record, "public");
        assert_eq!(rec.metadata.resource_type.id, "publication-article");
        assert_eq!(rec.metadata.title, "Foo");
        assert_eq!(rec.metadata.additional_titles[0].title, "Foo, Again");
        assert_eq!(rec.metadata.publication_date, "2019-07");

        let creators = &rec.metadata.creators;
        assert_eq!(creators.len(), 2);
        assert_eq!(creators[0].person_or_org.name, "Doe, Jane");
        assert_eq!(creators[0].person_or_org.identifier("clpid"), Some("Doe-J"));
        assert_eq!(creators[0].person_or_org.identifier("orcid"), Some("0000-0001-2345-6789"));
        assert_eq!(rec.metadata.contributors[0].role_id(), "editor");

        assert_eq!(rec.metadata.funding.len(), 2);
        assert_eq!(rec.metadata.funding[0].award.as_ref().map(|a| a.number.as_str()), Some("AST-1"));
        assert!(rec.metadata.funding[1].award.is_none());

        let subjects: Vec<&str> = rec.metadata.subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, ["alpha", "beta", "physics"]);

        let related = &rec.metadata.related_identifiers;
        assert_eq!(related[0].scheme, "doi");
        assert_eq!(related[1].relation_type.id, "ispublishedin");

        assert_eq!(rec.metadata.rights.len(), 1);
        assert_eq!(rec.custom_object("journal:journal").unwrap()["title"], "Journal of Foo");
        assert_eq!(rec.custom_fields["caltech:groups"][0]["id"], "Astronomy-Department");
        assert_eq!(rec.owner().map(|o| o.display_name.as_str()), Some("Jane Doe"));
        assert_eq!(rec.created, "2020-01-02T03:04:05+00:00");
    }

    #[test]
    fn staff_only_embargo_is_active() {
        let db = seeded_db().unwrap();
        let legacy = db.read_record(1).unwrap();
        let rec = legacy_to_modern(&legacy, &ctx()).unwrap().record;
        let embargo = rec.record_access.embargo.unwrap();
        assert!(embargo.active);
        assert_eq!(embargo.until, "2030-01-01");
        assert_eq!(rec.record_access.files, "restricted");

        let entry = &rec.files.unwrap().entries["paper.pdf"];
        assert_eq!(entry.checksum, "md5:abc123");
        assert_eq!(entry.metadata["security"], "internal");
    }

    #[test]
    fn lapsed_embargo_is_kept_but_open() {
        let mut rec = LegacyRecord {
            eprintid: 8,
            eprint_status: "archive".into(),
            metadata_visibility: "show".into(),
            title: "Released".into(),
            ..LegacyRecord::default()
        };
        rec.documents.push(Document {
            security: "public".into(),
            date_embargo: "2019-06-01".into(),
            files: vec![LegacyFile {
                filename: "paper.pdf".into(),
                ..LegacyFile::default()
            }],
            ..Document::default()
        });
        let access = legacy_to_modern(&rec, &ctx()).unwrap().record.record_access;
        let embargo = access.embargo.unwrap();
        assert!(!embargo.active);
        assert_eq!(embargo.until, "2019-06-01");
        assert_eq!(access.record, "public");
        assert_eq!(access.files, "public");
    }

    #[test]
    fn withheld_review_is_restricted() {
        let rec = LegacyRecord {
            eprintid: 9,
            eprint_status: "archive".into(),
            metadata_visibility: "show".into(),
            review_status: "withheld".into(),
            title: "Thesis".into(),
            ..LegacyRecord::default()
        };
        let out = legacy_to_modern(&rec, &ctx()).unwrap();
        assert_eq!(out.record.record_access.record, "restricted");
    }

    #[test]
    fn editors_become_creators_when_alone() {
        let mut rec = LegacyRecord {
            eprintid: 4,
            title: "Proceedings".into(),
            record_type: "book".into(),
            ..LegacyRecord::default()
        };
        rec.item_at_mut(SubList::Editors, 0).name = Name::person("", "Eve", "Editor", "");
        let out = legacy_to_modern(&rec, &ctx()).unwrap().record;
        assert_eq!(out.metadata.creators[0].role_id(), "editor");
        assert!(out.metadata.contributors.is_empty());
    }

    #[test]
    fn deletion_is_tombstone_only() {
        let rec = LegacyRecord {
            eprintid: 5,
            eprint_status: "deletion".into(),
            userid: 3,
            reviewer: "Admin".into(),
            suggestions: "duplicate".into(),
            title: "Gone".into(),
            ..LegacyRecord::default()
        };
        let out = legacy_to_modern(&rec, &ctx()).unwrap().record;
        let tomb = out.tombstone.unwrap();
        assert_eq!(tomb.reason, "duplicate");
        assert_eq!(tomb.removed_by.unwrap().display_name, "Admin");
        assert!(out.metadata.title.is_empty());
    }

    #[test]
    fn missing_eprintid_is_fatal() {
        let err = legacy_to_modern(&LegacyRecord::default(), &ctx()).unwrap_err();
        assert!(matches!(err, MetadataError::Crosswalk(_)));
    }

    #[test]
    fn derived_files_are_skipped() {
        let mut rec = LegacyRecord {
            eprintid: 6,
            ..LegacyRecord::default()
        };
        rec.documents.push(Document {
            formatdesc: "Thumbnail".into(),
            files: vec![LegacyFile {
                filename: "small.png".into(),
                ..LegacyFile::default()
            }],
            ..Document::default()
        });
        rec.documents.push(Document {
            security: "public".into(),
            files: vec![
                LegacyFile { filename: "indexcodes.txt".into(), ..LegacyFile::default() },
                LegacyFile { filename: "preview-1.png".into(), ..LegacyFile::default() },
            ],
            ..Document::default()
        });
        let files = legacy_to_modern(&rec, &ctx()).unwrap().record.files.unwrap();
        assert_eq!(files.order, ["preview-1.png"]);
        assert_eq!(files.default_preview, "preview-1.png");
    }

    #[test]
    fn pmcids_split_and_upper() {
        assert_eq!(normalize_pmcids("pmc1, PMC2;pmc3"), ["PMC1", "PMC2", "PMC3"]);
        assert!(normalize_pmcids("").is_empty());
    }
}

use chrono::DateTime;
use rdmkit_core::models::{
    Creator, Item, ItemList, LegacyRecord, ModernRecord, Name, PersonOrOrg, SubList,
};
use serde_json::{Map, Value};

use super::{CrosswalkContext, Crosswalked};
use crate::error::{MetadataError, Result};
use crate::vocab::legacy_record_type;

/// RFC 3339 → `YYYY-MM-DD HH:MM:SS`; other strings are kept.
fn legacy_timestamp(s: &str) -> String {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| s.to_string())
}

fn push(rec: &mut LegacyRecord, kind: SubList, item: Item) {
    rec.sublist_mut(kind).get_or_insert_with(ItemList::new).push(item);
}

fn text<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().trim()
}

fn person_item(p: &PersonOrOrg) -> Item {
    let mut item = Item::default();
    if p.is_personal() {
        item.name = Name::person("", &p.given_name, &p.family_name, "");
    } else {
        item.name = Name::literal(&p.name);
    }
    for id in &p.identifiers {
        match id.scheme.as_str() {
            "clpid" => item.id = id.identifier.clone(),
            "orcid" => item.orcid = id.identifier.clone(),
            "ror" => {
                item.ror = id.identifier.clone();
                item.uri = id.identifier.clone();
            }
            _ => {}
        }
    }
    item
}

/// Sort one creator or contributor into its legacy sub-list.
fn place_agent(rec: &mut LegacyRecord, c: &Creator, as_contributor: bool) {
    let role = c.role_id();
    let mut item = person_item(&c.person_or_org);
    let kind = match (role, c.person_or_org.is_personal(), as_contributor) {
        ("editor", true, _) => SubList::Editors,
        ("thesis_advisor", true, _) => SubList::ThesisAdvisor,
        ("thesis_committee", true, _) => SubList::ThesisCommittee,
        (_, true, false) => SubList::Creators,
        (_, false, false) => SubList::CorpCreators,
        (_, true, true) => {
            item.role = role.to_string();
            SubList::Contributors
        }
        (_, false, true) => SubList::CorpContributors,
    };
    push(rec, kind, item);
}

fn apply_custom_fields(rec: &mut LegacyRecord, fields: &Map<String, Value>) {
    if let Some(journal) = fields.get("journal:journal").and_then(Value::as_object) {
        rec.publication = text(journal, "title").to_string();
        rec.volume = text(journal, "volume").to_string();
        rec.number = text(journal, "issue").to_string();
        rec.pagerange = text(journal, "pages").to_string();
        rec.series = text(journal, "series").to_string();
        rec.issn = text(journal, "issn").to_string();
    }
    if let Some(imprint) = fields.get("imprint:imprint").and_then(Value::as_object) {
        rec.isbn = text(imprint, "isbn").to_string();
        rec.book_title = text(imprint, "title").to_string();
        if rec.pagerange.is_empty() {
            rec.pagerange = text(imprint, "pages").to_string();
        }
        rec.place_of_pub = text(imprint, "place").to_string();
        if rec.series.is_empty() {
            rec.series = text(imprint, "series").to_string();
        }
    }
    if let Some(series) = fields.get("caltech:series").and_then(Value::as_str) {
        rec.series = series.to_string();
    }
    if let Some(place) = fields.get("caltech:place_of_publication").and_then(Value::as_str) {
        rec.place_of_pub = place.to_string();
    }
    if let Some(thesis) = fields.get("thesis:thesis").and_then(Value::as_object) {
        rec.thesis_type = text(thesis, "type").to_lowercase();
        rec.institution = text(thesis, "university").to_string();
        rec.department = text(thesis, "department").to_string();
    }
    if let Some(meeting) = fields.get("meeting:meeting").and_then(Value::as_object) {
        rec.event_type = text(meeting, "type").to_string();
        rec.event_title = text(meeting, "title").to_string();
        rec.event_location = text(meeting, "place").to_string();
        rec.event_dates = text(meeting, "dates").to_string();
    }
    if let Some(note) = fields.get("caltech:internal_note").and_then(Value::as_str) {
        rec.suggestions = note.to_string();
    }
    for group in fields
        .get("caltech:groups")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let id = group.get("id").and_then(Value::as_str).unwrap_or_default();
        if !id.is_empty() {
            push(rec, SubList::LocalGroup, Item { value: id.replace('-', " "), ..Item::default() });
        }
    }
    let other_name = fields.get("caltech:other_num_name").and_then(Value::as_str).unwrap_or_default();
    let other_id = fields.get("caltech:other_num_id").and_then(Value::as_str).unwrap_or_default();
    if !other_name.is_empty() || !other_id.is_empty() {
        push(
            rec,
            SubList::OtherNumberingSystem,
            Item {
                name: Name::literal(other_name),
                id: other_id.to_string(),
                ..Item::default()
            },
        );
    }
}

/// Build a legacy record from a Modern Repo record, for deposit through the SQL writer.
///
/// Tombstones cannot be deposited and are rejected.
pub fn modern_to_legacy(src: &ModernRecord, ctx: &CrosswalkContext) -> Result<Crosswalked<LegacyRecord>> {
    if src.tombstone.is_some() {
        return Err(MetadataError::Crosswalk(format!("{} is a tombstone", src.id)));
    }
    let md = &src.metadata;
    let mut warnings = Vec::new();
    let mut rec = LegacyRecord::default();

    if src.record_access.record == "public" {
        rec.eprint_status = "archive".into();
        rec.metadata_visibility = "show".into();
        rec.full_text_status = src.record_access.files.clone();
    } else {
        rec.eprint_status = "inbox".into();
        rec.metadata_visibility = "no_search".into();
        rec.full_text_status = "restricted".into();
    }

    rec.eprintid = md
        .identifier("eprintid")
        .or_else(|| src.id.rsplit(':').next())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default();
    rec.record_type = legacy_record_type(&md.resource_type.id);
    if rec.record_type.is_empty() {
        warnings.push("record has no resource type".to_string());
    }
    rec.title = md.title.clone();
    if rec.title.is_empty() {
        warnings.push("record has no title".to_string());
    }
    for t in &md.additional_titles {
        push(&mut rec, SubList::AltTitle, Item { value: t.title.clone(), ..Item::default() });
    }
    rec.abstract_text = md.description.clone();

    for c in &md.creators {
        place_agent(&mut rec, c, false);
    }
    for c in &md.contributors {
        place_agent(&mut rec, c, true);
    }

    if !md.publication_date.is_empty() {
        rec.date = md.publication_date.clone();
        rec.date_type = "published".into();
        rec.ispublished = "pub".into();
    }
    rec.datestamp = legacy_timestamp(&src.created);
    rec.lastmod = legacy_timestamp(&src.updated);

    rec.keywords = md
        .subjects
        .iter()
        .map(|s| s.subject.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    rec.rights = md
        .rights
        .iter()
        .find_map(|r| r.description.get("en").or_else(|| r.title.get("en")))
        .cloned()
        .unwrap_or_default();
    for d in &md.additional_descriptions {
        match d.description_type.id.as_str() {
            "errata" => rec.errata = d.description.clone(),
            _ if rec.note.is_empty() => rec.note = d.description.clone(),
            _ => {}
        }
    }
    rec.publisher = md.publisher.clone();

    for f in &md.funding {
        push(
            &mut rec,
            SubList::Funders,
            Item {
                agency: f.funder.name.clone(),
                grant_number: f.award.as_ref().map(|a| a.number.clone()).unwrap_or_default(),
                ror: f.funder.id.clone(),
                ..Item::default()
            },
        );
    }
    for r in &md.related_identifiers {
        let item_type = match (r.scheme.as_str(), r.relation_type.id.as_str()) {
            ("doi", _) => "doi",
            (_, "ispublishedin") => "pub",
            _ => "",
        };
        push(
            &mut rec,
            SubList::RelatedUrl,
            Item {
                url: r.identifier.clone(),
                item_type: item_type.to_string(),
                ..Item::default()
            },
        );
    }

    apply_custom_fields(&mut rec, &src.custom_fields);

    rec.doi = src.doi().unwrap_or_default().to_string();
    if rec.issn.is_empty() {
        rec.issn = src.pid("issn").unwrap_or_default().to_string();
    }
    if rec.isbn.is_empty() {
        rec.isbn = src.pid("isbn").unwrap_or_default().to_string();
    }
    rec.id_number = md.identifier("resolverid").unwrap_or_default().to_string();
    rec.pmc_id = md
        .identifiers
        .iter()
        .filter(|i| i.scheme == "pmcid")
        .map(|i| i.identifier.as_str())
        .collect::<Vec<_>>()
        .join(",");
    if !ctx.rdm_url.is_empty() && !src.id.is_empty() {
        rec.official_url = format!("{}/records/{}", ctx.rdm_url.trim_end_matches('/'), src.id);
    }
    if let Some(owner) = src.owner() {
        rec.userid = owner.user;
    }
    rec.split_dates();
    Ok(Crosswalked::new(rec, warnings))
}

#[cfg(test)]
mod tests {
    use rdmkit_core::storage::legacy::fixtures::seeded_db;

    use super::*;
    use crate::crosswalk::legacy_to_modern;

    fn ctx() -> CrosswalkContext {
        CrosswalkContext {
            collection: "CaltechAUTHORS".into(),
            rdm_url: "https://rdm.example.edu".into(),
            ..CrosswalkContext::default()
        }
    }

    #[test]
    fn legacy_round_trip_keeps_core_fields() {
        let db = seeded_db().unwrap();
        let legacy = db.read_record(1).unwrap();
        let modern = legacy_to_modern(&legacy, &ctx()).unwrap().record;
        let back = modern_to_legacy(&modern, &ctx()).unwrap().record;

        assert_eq!(back.eprintid, 1);
        assert_eq!(back.eprint_status, "archive");
        assert_eq!(back.record_type, "article");
        assert_eq!(back.title, "Foo");
        assert_eq!(back.doi, "10.1/x");
        assert_eq!(back.date, "2019-07");
        assert_eq!(back.date_year, 2019);
        assert_eq!(back.publication, "Journal of Foo");
        assert_eq!(back.volume, "12");
        assert_eq!(back.number, "3");
        assert_eq!(back.keywords, "alpha; beta; physics");
        assert_eq!(back.datestamp, "2020-01-02 03:04:05");

        let creators = back.items(SubList::Creators);
        assert_eq!(creators.len(), 2);
        assert_eq!(creators[0].family(), "Doe");
        assert_eq!(creators[0].id, "Doe-J");
        assert_eq!(creators[1].pos, 1);
        assert_eq!(back.items(SubList::Editors)[0].family(), "Editor");
        assert_eq!(back.items(SubList::Funders)[0].grant_number, "AST-1");
        assert_eq!(back.items(SubList::LocalGroup)[0].value, "Astronomy Department");
        assert_eq!(back.official_url, "https://rdm.example.edu/records/CaltechAUTHORS:1");
        assert_eq!(back.userid, 5);
    }

    #[test]
    fn restricted_record_goes_to_inbox() {
        let mut modern = ModernRecord::default();
        modern.metadata.title = "Draft".into();
        modern.metadata.resource_type.id = "publication-technicalnote".into();
        modern.metadata.creators.push(Creator::new(PersonOrOrg::organization("JPL"), None));
        let back = modern_to_legacy(&modern, &CrosswalkContext::default()).unwrap().record;
        assert_eq!(back.eprint_status, "inbox");
        assert_eq!(back.metadata_visibility, "no_search");
        assert_eq!(back.record_type, "monograph");
        assert_eq!(back.items(SubList::CorpCreators)[0].literal(), "JPL");
        assert_eq!(back.eprintid, 0);
    }

    #[test]
    fn tombstones_are_rejected() {
        let modern = ModernRecord {
            id: "x:1".into(),
            tombstone: Some(Default::default()),
            ..ModernRecord::default()
        };
        assert!(modern_to_legacy(&modern, &ctx()).is_err());
    }
}

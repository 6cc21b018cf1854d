use rdmkit_core::dates::date_parts;
use rdmkit_core::models::{Agent, Citation, Creator, DateObject, LegacyRecord, ModernRecord, PersonOrOrg};
use serde_json::{Map, Value};

use super::{legacy_to_modern, CrosswalkContext, Crosswalked};
use crate::error::{MetadataError, Result};
use crate::identifiers::link_to_doi;

fn agent(p: &PersonOrOrg) -> Agent {
    let mut a = if p.is_personal() {
        Agent::person(&p.family_name, &p.given_name)
    } else {
        Agent::organization(&p.name)
    };
    for id in &p.identifiers {
        let value = id.identifier.clone();
        match id.scheme.as_str() {
            "orcid" => a.orcid = value,
            "clpid" => a.clpid = value,
            "ror" => a.ror = value,
            "isni" => a.isni = value,
            _ => {}
        }
    }
    a
}

fn file_agent(cite: &mut Citation, c: &Creator) {
    let a = agent(&c.person_or_org);
    match c.role_id() {
        "" | "author" => cite.author.push(a),
        "editor" => cite.editor.push(a),
        "reviewer" => cite.reviewer.push(a),
        "translator" => cite.translator.push(a),
        "thesis_advisor" => cite.thesis_advisor.push(a),
        "thesis_committee" => cite.thesis_committee.push(a),
        _ => cite.contributor.push(a),
    }
}

fn field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn date_object(date: &str) -> DateObject {
    DateObject {
        date_parts: vec![date_parts(date)],
        raw: date.to_string(),
    }
}

fn apply_custom_fields(cite: &mut Citation, rec: &ModernRecord) {
    if let Some(journal) = rec.custom_object("journal:journal") {
        cite.publication = field(journal, "title");
        cite.volume = field(journal, "volume");
        cite.issue = field(journal, "issue");
        cite.pages = field(journal, "pages");
        cite.series = field(journal, "series");
        cite.issn = field(journal, "issn");
    } else if let Some(imprint) = rec.custom_object("imprint:imprint") {
        cite.publication = field(imprint, "title");
        cite.isbn = field(imprint, "isbn");
        cite.pages = field(imprint, "pages");
        cite.place_of_publication = field(imprint, "place");
        cite.series = field(imprint, "series");
    }
    if let Some(series) = rec.custom_str("caltech:series") {
        cite.series = series.to_string();
    }
    if let Some(place) = rec.custom_str("caltech:place_of_publication") {
        cite.place_of_publication = place.to_string();
    }
    if let Some(thesis) = rec.custom_object("thesis:thesis") {
        cite.thesis_type = field(thesis, "type");
        cite.thesis_degree_grantor = field(thesis, "university");
        cite.thesis_department = field(thesis, "department");
    }
    cite.local_group = rec
        .custom_fields
        .get("caltech:groups")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|g| g.get("id").and_then(Value::as_str))
        .map(Agent::organization)
        .collect();
}

/// Flatten a Modern Repo record into a citation.
///
/// The citation id is `lower("<collection>:<collection_id>")` with any `.ds`
/// suffix trimmed from the collection. When `cite_using_url` is empty the DOI
/// link is used instead.
pub fn modern_to_citation(
    rec: &ModernRecord,
    collection: &str,
    collection_id: &str,
    cite_using_url: &str,
) -> Result<Crosswalked<Citation>> {
    let collection = collection.trim().trim_end_matches(".ds");
    let collection_id = collection_id.trim();
    if collection.is_empty() || collection_id.is_empty() {
        return Err(MetadataError::Crosswalk(format!(
            "citation needs a collection and id (got {collection:?}, {collection_id:?})"
        )));
    }
    let md = &rec.metadata;
    let mut warnings = Vec::new();
    let mut cite = Citation {
        id: format!("{collection}:{collection_id}").to_lowercase(),
        collection: collection.to_string(),
        collection_id: collection_id.to_string(),
        resource_type: md.resource_type.id.clone(),
        title: md.title.clone(),
        alternate_title: md.additional_titles.iter().map(|t| t.title.clone()).collect(),
        publisher: md.publisher.clone(),
        publication_date: md.publication_date.clone(),
        abstract_text: md.description.clone(),
        doi: rec.doi().unwrap_or_default().to_string(),
        pmcid: md.identifier("pmcid").unwrap_or_default().to_string(),
        ..Citation::default()
    };

    cite.cite_using_url = if !cite_using_url.trim().is_empty() {
        cite_using_url.trim().to_string()
    } else if !cite.doi.is_empty() {
        format!("https://doi.org/{}", link_to_doi(&cite.doi))
    } else {
        warnings.push("no URL to cite".to_string());
        String::new()
    };

    for c in md.creators.iter().chain(&md.contributors) {
        file_agent(&mut cite, c);
    }
    if cite.author.is_empty() {
        warnings.push("citation has no authors".to_string());
    }

    for d in &md.dates {
        cite.dates
            .entry(d.date_type.id.clone())
            .or_insert_with(|| date_object(&d.date));
    }
    if !md.publication_date.is_empty() {
        cite.dates
            .entry("issued".to_string())
            .or_insert_with(|| date_object(&md.publication_date));
    }

    apply_custom_fields(&mut cite, rec);
    if cite.isbn.is_empty() {
        cite.isbn = rec.pid("isbn").unwrap_or_default().to_string();
    }
    if cite.issn.is_empty() {
        cite.issn = rec.pid("issn").unwrap_or_default().to_string();
    }

    cite.validate().map_err(|e| MetadataError::Crosswalk(e.to_string()))?;
    Ok(Crosswalked::new(cite, warnings))
}

/// Legacy record → Modern record → citation. The legacy official URL, when
/// set, is the URL to cite.
pub fn legacy_to_citation(rec: &LegacyRecord, ctx: &CrosswalkContext) -> Result<Crosswalked<Citation>> {
    let modern = legacy_to_modern(rec, ctx)?;
    let collection = if rec.collection.is_empty() { ctx.collection.as_str() } else { rec.collection.as_str() };
    let cite = modern_to_citation(&modern.record, collection, &rec.eprintid.to_string(), &rec.official_url)?;
    let mut warnings = modern.warnings;
    warnings.extend(cite.warnings);
    Ok(Crosswalked::new(cite.record, warnings))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rdmkit_core::models::{Identifier, TypeRef};
    use rdmkit_core::storage::legacy::fixtures::seeded_db;
    use serde_json::json;

    use super::*;
    use crate::crosswalk::{crossref_to_modern, RorCache};
    use crate::sources::CrossRefWork;

    fn ctx() -> CrosswalkContext {
        CrosswalkContext {
            collection: "CaltechAUTHORS".into(),
            ..CrosswalkContext::default()
        }
    }

    fn names(people: impl Iterator<Item = (String, String, String)>) -> BTreeSet<(String, String, String)> {
        people.collect()
    }

    #[test]
    fn legacy_record_cites_doi() {
        let db = seeded_db().unwrap();
        let legacy = db.read_record(1).unwrap();
        let cite = legacy_to_citation(&legacy, &ctx()).unwrap().record;

        assert_eq!(cite.id, "caltechauthors:1");
        assert_eq!(cite.collection_id, "1");
        assert_eq!(cite.cite_using_url, "https://doi.org/10.1/x");
        assert_eq!(cite.title, "Foo");
        assert_eq!(cite.author[0].family_name, "Doe");
        assert_eq!(cite.author[0].clpid, "Doe-J");
        assert_eq!(cite.author[1].family_name, "Smith");
        assert_eq!(cite.editor[0].family_name, "Editor");
        assert_eq!(cite.publication, "Journal of Foo");
        assert_eq!(cite.volume, "12");
        assert_eq!(cite.dates["pub_date"].date_parts, vec![vec![2019, 7]]);
        assert_eq!(cite.local_group[0].literal, "Astronomy-Department");
    }

    #[test]
    fn official_url_wins() {
        let db = seeded_db().unwrap();
        let mut legacy = db.read_record(1).unwrap();
        legacy.official_url = "https://repo.example.edu/1/".into();
        let cite = legacy_to_citation(&legacy, &ctx()).unwrap().record;
        assert_eq!(cite.cite_using_url, "https://repo.example.edu/1/");
    }

    #[test]
    fn roles_partition_without_loss() {
        let mut rec = ModernRecord::default();
        rec.metadata.title = "Roles".into();
        rec.metadata.creators = vec![
            Creator::new(PersonOrOrg::person("Doe", "Jane"), None),
            Creator::new(PersonOrOrg::organization("JPL"), Some("author")),
        ];
        rec.metadata.contributors = vec![
            Creator::new(PersonOrOrg::person("Eve", "Editor"), Some("editor")),
            Creator::new(PersonOrOrg::person("Ann", "Advisor"), Some("thesis_advisor")),
            Creator::new(PersonOrOrg::person("Tim", "Other"), Some("datacurator")),
        ];
        let cite = modern_to_citation(&rec, "thesis.ds", "abc", "").unwrap().record;
        assert_eq!(cite.id, "thesis:abc");
        assert_eq!(cite.author.len(), 2);
        assert_eq!(cite.thesis_advisor.len(), 1);
        assert_eq!(cite.contributor[0].family_name, "Tim");

        let modern = names(rec.metadata.creators.iter().chain(&rec.metadata.contributors).map(|c| {
            let p = &c.person_or_org;
            let literal = if p.is_personal() { String::new() } else { p.name.clone() };
            (p.family_name.clone(), p.given_name.clone(), literal)
        }));
        let cited = names(
            cite.agents()
                .map(|a| (a.family_name.clone(), a.lived_name.clone(), a.literal.clone())),
        );
        assert_eq!(modern, cited);
    }

    #[test]
    fn id_is_lowercased() {
        let mut rec = ModernRecord::default();
        rec.metadata.identifiers.push(Identifier::new("doi", "10.5/Q"));
        rec.metadata.resource_type = TypeRef::new("publication-article");
        let cite = modern_to_citation(&rec, "CaltechDATA", "abc12-3def4", "").unwrap().record;
        assert_eq!(cite.id, "caltechdata:abc12-3def4");
        assert_eq!(cite.cite_using_url, "https://doi.org/10.5/Q");
        assert!(modern_to_citation(&rec, "CaltechDATA", "", "").is_err());
    }

    #[test]
    fn crossref_author_order_survives() {
        let work = CrossRefWork::from_json(&json!({
            "DOI": "10.1/abc",
            "title": ["Order"],
            "author": [{"family": "Zeta", "given": "A"}, {"family": "Alpha", "given": "B"},
                       {"family": "Mu", "given": "C"}]
        }))
        .unwrap();
        let modern = crossref_to_modern(&work, &ctx(), &RorCache::new()).unwrap().record;
        let cite = modern_to_citation(&modern, "authors", "x1", "").unwrap().record;
        let families: Vec<&str> = cite.author.iter().map(|a| a.family_name.as_str()).collect();
        assert_eq!(families, ["Zeta", "Alpha", "Mu"]);
    }
}

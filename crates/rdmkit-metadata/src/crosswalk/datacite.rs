use rdmkit_core::models::{
    Affiliation, Award, Creator, Funder, Funding, Identifier, LangMap, ModernRecord, PersonOrOrg,
    Right, Subject, TitleDetail, TypeRef,
};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{CrosswalkContext, Crosswalked};
use crate::error::{MetadataError, Result};
use crate::identifiers::{doi_prefix, link_to_doi};
use crate::sources::datacite::DataCitePerson;
use crate::sources::DataCiteObject;

fn person(p: &DataCitePerson, role: Option<&str>) -> Option<Creator> {
    let mut who = if !p.is_organization() {
        if p.family.is_empty() && p.given.is_empty() {
            // "Family, Given" with no structured parts.
            let (family, given) = p.name.split_once(',').unwrap_or((p.name.as_str(), ""));
            PersonOrOrg::person(family.trim(), given.trim())
        } else {
            PersonOrOrg::person(&p.family, &p.given)
        }
    } else if !p.name.is_empty() {
        PersonOrOrg::organization(&p.name)
    } else {
        return None;
    };
    if !p.orcid.is_empty() {
        who.identifiers.push(Identifier::new("orcid", &p.orcid));
    }
    if !p.ror.is_empty() {
        who.identifiers.push(Identifier::new("ror", &p.ror));
    }
    let mut creator = Creator::new(who, role);
    creator.affiliations = p
        .affiliations
        .iter()
        .map(|name| Affiliation {
            name: name.clone(),
            ..Affiliation::default()
        })
        .collect();
    Some(creator)
}

/// DOI from the identifier list (`https://doi.org/<x>`), else the `doi` attribute.
fn find_doi(obj: &DataCiteObject) -> Option<String> {
    obj.identifiers()
        .into_iter()
        .find(|(kind, value)| kind.eq_ignore_ascii_case("DOI") || value.contains("doi.org/"))
        .map(|(_, value)| link_to_doi(&value))
        .filter(|d| !d.is_empty())
        .or_else(|| obj.doi())
}

fn funding(obj: &DataCiteObject) -> Vec<Funding> {
    obj.funders()
        .into_iter()
        .filter(|f| !f.name.is_empty())
        .map(|f| {
            let ror = f.identifier_type.eq_ignore_ascii_case("ROR");
            Funding {
                funder: Funder {
                    id: if ror { f.identifier.clone() } else { String::new() },
                    name: f.name.clone(),
                    scheme: if ror { "ror".to_string() } else { String::new() },
                },
                award: (!f.award_number.is_empty()).then(|| Award {
                    number: f.award_number.clone(),
                    title: if f.award_title.is_empty() {
                        LangMap::new()
                    } else {
                        LangMap::from([("en".to_string(), f.award_title.clone())])
                    },
                    ..Award::default()
                }),
            }
        })
        .collect()
}

/// Translate a DataCite DOI record into a Modern Repo record.
///
/// A record with no DOI at all cannot be identified and is rejected.
pub fn datacite_to_modern(obj: &DataCiteObject, ctx: &CrosswalkContext) -> Result<Crosswalked<ModernRecord>> {
    let doi = find_doi(obj).ok_or_else(|| MetadataError::Crosswalk("DataCite record has no DOI".to_string()))?;
    let mut out = ModernRecord::default();
    let mut warnings = Vec::new();
    out.set_pid("doi", &doi, "datacite");

    let issns = obj.issns();
    let prefix = doi_prefix(&doi).unwrap_or_default();
    let md = &mut out.metadata;
    match obj.resource_type() {
        Some(t) => md.resource_type = TypeRef::new(ctx.vocab.map_resource_type(&t)),
        None => warnings.push("record has no resource type".to_string()),
    }

    let mut titles = obj.titles().into_iter();
    match titles.next() {
        Some(t) => md.title = t,
        None => warnings.push("record has no title".to_string()),
    }
    md.additional_titles = titles
        .map(|title| TitleDetail {
            title,
            title_type: TypeRef::new("alternative-title"),
            lang: None,
        })
        .collect();
    match obj.abstract_text() {
        Some(d) => md.description = d,
        None => warnings.push("record has no abstract".to_string()),
    }

    md.creators = obj.creators().iter().filter_map(|p| person(p, None)).collect();
    md.contributors = obj
        .contributors()
        .iter()
        .filter_map(|p| {
            let role = ctx.vocab.map_contributor_role(&p.contributor_type.to_lowercase());
            person(p, Some(&role))
        })
        .collect();

    if let Some(publisher) = obj.publisher() {
        md.publisher = ctx.vocab.normalize_publisher_name(&publisher, &issns, &prefix);
    }
    match obj.issued().or_else(|| obj.available()) {
        Some(date) => {
            md.add_date(&date, "issued", "Publication date");
            md.publication_date = date;
        }
        None => warnings.push("record has no publication date".to_string()),
    }
    if let Some(date) = obj.available() {
        md.add_date(&date, "available", "Available");
    }
    if let Some(date) = obj.accepted() {
        md.add_date(&date, "accepted", "Accepted");
    }

    md.add_identifier("doi", &doi);
    for (kind, value) in obj.identifiers() {
        let kind = kind.to_lowercase();
        if kind != "doi" {
            md.add_identifier(&kind, &value);
        }
    }
    if let Some(url) = obj.url() {
        md.add_identifier("url", &url);
    }
    md.rights = obj
        .rights()
        .into_iter()
        .filter(|r| !r.rights.is_empty() || !r.uri.is_empty())
        .map(|r| Right {
            id: r.identifier.to_lowercase(),
            title: LangMap::from([("en".to_string(), r.rights.clone())]),
            link: r.uri,
            ..Right::default()
        })
        .collect();
    md.subjects = obj
        .subjects()
        .into_iter()
        .map(|subject| Subject {
            id: String::new(),
            subject,
        })
        .collect();
    md.funding = funding(obj);

    if let Some(publication) = obj.publication() {
        let mut journal = Map::new();
        journal.insert("title".into(), json!(ctx.vocab.normalize_journal_name(&publication, &issns)));
        for (key, value) in [("volume", obj.volume()), ("issue", obj.issue()), ("pages", obj.pages())] {
            if let Some(v) = value {
                journal.insert(key.into(), json!(v));
            }
        }
        if let Some(issn) = issns.first() {
            journal.insert("issn".into(), json!(issn));
        }
        out.custom_fields.insert("journal:journal".into(), Value::Object(journal));
    }
    if let Some(issn) = issns.first() {
        out.set_pid("issn", issn, "");
    }
    if let Some(isbn) = obj.isbns().first() {
        out.set_pid("isbn", isbn, "");
    }

    debug!(doi = %doi, warnings = warnings.len(), "DataCite record crosswalked");
    Ok(Crosswalked::new(out, warnings))
}

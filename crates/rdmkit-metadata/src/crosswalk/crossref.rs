use rdmkit_core::models::{
    Affiliation, Award, Creator, Funder, Funding, Identifier, LangMap, ModernRecord, PersonOrOrg,
    Right, Subject, TitleDetail, TypeRef,
};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{CrosswalkContext, Crosswalked, RorCache};
use crate::error::Result;
use crate::identifiers::doi_prefix;
use crate::sources::crossref::CrossRefPerson;
use crate::sources::CrossRefWork;

/// Earliest sensible publication date: `published`, else the lesser of the
/// print and online dates, else `accepted`.
///
/// Dates compare as strings, so `2001-02` wins over `2001-02-15`.
pub fn pick_publication_date(work: &CrossRefWork) -> Option<String> {
    if let Some(d) = work.published() {
        return Some(d);
    }
    match (work.published_print(), work.published_online()) {
        (Some(p), Some(o)) => Some(if p <= o { p } else { o }),
        (Some(d), None) | (None, Some(d)) => Some(d),
        (None, None) => work.accepted(),
    }
}

/// DOI suffixes of funders that need a ROR lookup before crosswalking.
pub fn funder_ror_keys(work: &CrossRefWork) -> Vec<String> {
    let mut keys: Vec<String> = work
        .funders()
        .into_iter()
        .filter(|f| f.ror.is_none())
        .filter_map(|f| f.doi.split_once('/').map(|(_, suffix)| suffix.to_string()))
        .filter(|s| !s.is_empty())
        .collect();
    keys.dedup();
    keys
}

fn person(p: &CrossRefPerson, role: Option<&str>) -> Option<Creator> {
    let mut who = if !p.family.is_empty() || !p.given.is_empty() {
        PersonOrOrg::person(&p.family, &p.given)
    } else if !p.name.is_empty() {
        PersonOrOrg::organization(&p.name)
    } else {
        return None;
    };
    if !p.orcid.is_empty() {
        who.identifiers.push(Identifier::new("orcid", &p.orcid));
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

fn funding(work: &CrossRefWork, ror: &RorCache) -> Vec<Funding> {
    let mut out = Vec::new();
    for f in work.funders() {
        let id = f.ror.clone().or_else(|| {
            f.doi
                .split_once('/')
                .and_then(|(_, suffix)| ror.get(suffix).cloned().flatten())
        });
        let funder = Funder {
            scheme: if id.is_some() { "ror".to_string() } else { String::new() },
            id: id.unwrap_or_default(),
            name: f.name.clone(),
        };
        if f.awards.is_empty() {
            out.push(Funding { funder, award: None });
            continue;
        }
        for number in &f.awards {
            out.push(Funding {
                funder: funder.clone(),
                award: Some(Award {
                    number: number.clone(),
                    ..Award::default()
                }),
            });
        }
    }
    out
}

fn rights(work: &CrossRefWork) -> Vec<Right> {
    work.licenses()
        .into_iter()
        .filter(|l| !l.url.is_empty())
        .map(|l| {
            let description = if l.content_version.is_empty() {
                "url to license".to_string()
            } else {
                l.content_version.clone()
            };
            Right {
                title: LangMap::from([("en".to_string(), "url".to_string())]),
                description: LangMap::from([("en".to_string(), description)]),
                link: l.url,
                ..Right::default()
            }
        })
        .collect()
}

fn journal(work: &CrossRefWork, ctx: &CrosswalkContext, issns: &[String]) -> Map<String, Value> {
    let mut j = Map::new();
    if let Some(title) = work.container_title() {
        j.insert("title".into(), json!(ctx.vocab.normalize_journal_name(&title, issns)));
    }
    let pages = work.page().or_else(|| work.article_number());
    for (key, value) in [("volume", work.volume()), ("issue", work.issue()), ("pages", pages)] {
        if let Some(v) = value {
            j.insert(key.into(), json!(v));
        }
    }
    if let Some(issn) = issns.first() {
        j.insert("issn".into(), json!(issn));
    }
    j
}

/// Translate a CrossRef work into a Modern Repo record.
///
/// `ror` must already hold the lookups named by [`funder_ror_keys`]; missing
/// entries leave the funder without an id.
pub fn crossref_to_modern(
    work: &CrossRefWork,
    ctx: &CrosswalkContext,
    ror: &RorCache,
) -> Result<Crosswalked<ModernRecord>> {
    let mut out = ModernRecord::default();
    let mut warnings = Vec::new();
    let issns = work.issns();

    let doi = work.doi();
    let prefix = match &doi {
        Some(doi) => {
            out.set_pid("doi", doi, "external");
            doi_prefix(doi).unwrap_or_default()
        }
        None => {
            warnings.push("work has no DOI".to_string());
            String::new()
        }
    };

    let md = &mut out.metadata;
    match work.resource_type() {
        Some(t) => md.resource_type = TypeRef::new(ctx.vocab.map_resource_type(&t)),
        None => warnings.push("work has no type".to_string()),
    }

    let mut titles = work.titles().into_iter();
    match titles.next() {
        Some(t) => md.title = t,
        None => warnings.push("work has no title".to_string()),
    }
    md.additional_titles = titles
        .map(|title| TitleDetail {
            title,
            title_type: TypeRef::new("alternative-title"),
            lang: None,
        })
        .collect();
    md.description = work.abstract_text().unwrap_or_default();

    md.creators = work.authors().iter().filter_map(|p| person(p, None)).collect();
    if md.creators.is_empty() {
        warnings.push("work has no authors".to_string());
    }
    md.contributors = work
        .editors()
        .iter()
        .filter_map(|p| person(p, Some("editor")))
        .chain(work.translators().iter().filter_map(|p| person(p, Some("translator"))))
        .chain(work.chairs().iter().filter_map(|p| person(p, Some("contributor"))))
        .collect();

    if let Some(publisher) = work.publisher() {
        md.publisher = ctx.vocab.normalize_publisher_name(&publisher, &issns, &prefix);
    }
    if let Some(date) = pick_publication_date(work) {
        md.add_date(&date, "issued", "Publication date");
        md.publication_date = date;
    } else {
        warnings.push("work has no publication date".to_string());
    }
    if let Some(date) = work.accepted() {
        md.add_date(&date, "accepted", "Accepted");
    }
    if let Some(date) = work.approved() {
        md.add_date(&date, "available", "Approved");
    }

    if let Some(doi) = &doi {
        md.add_identifier("doi", doi);
    }
    for link in work.links() {
        md.identifiers.push(Identifier {
            scheme: "url".to_string(),
            identifier: link.url,
            name: link.content_type,
        });
    }
    md.rights = rights(work);
    md.subjects = work
        .subjects()
        .into_iter()
        .map(|subject| Subject {
            id: String::new(),
            subject,
        })
        .collect();
    md.funding = funding(work, ror);

    let journal = journal(work, ctx, &issns);
    if !journal.is_empty() {
        out.custom_fields.insert("journal:journal".into(), Value::Object(journal));
    }
    let isbns = work.isbns();
    if let Some(isbn) = isbns.first() {
        let mut imprint = Map::new();
        imprint.insert("isbn".into(), json!(isbn));
        if let Some(place) = work.publisher_location() {
            imprint.insert("place".into(), json!(place));
        }
        out.custom_fields.insert("imprint:imprint".into(), Value::Object(imprint));
        out.set_pid("isbn", isbn, "");
    }
    if let Some(issn) = issns.first() {
        out.set_pid("issn", issn, "");
    }

    debug!(doi = doi.as_deref().unwrap_or(""), warnings = warnings.len(), "CrossRef work crosswalked");
    Ok(Crosswalked::new(out, warnings))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::vocab::Vocabularies;

    fn work() -> CrossRefWork {
        CrossRefWork::from_json(&json!({
            "DOI": "10.1021/acsami.7b15651",
            "type": "journal-article",
            "title": ["Foo Bar Materials"],
            "publisher": "American Chemical Society (ACS)",
            "container-title": ["ACS Applied Materials and Interfaces"],
            "short-container-title": ["ACS Appl. Mater. Interfaces"],
            "volume": "10",
            "issue": "3",
            "page": "2001-2010",
            "ISSN": ["1944-8244"],
            "author": [
                {"given": "Jane", "family": "Doe", "ORCID": "https://orcid.org/0000-0001-2345-6789"},
                {"given": "John", "family": "Smith"},
                {"name": "The Foo Consortium"}
            ],
            "editor": [{"given": "Eve", "family": "Editor"}],
            "funder": [
                {"name": "NSF", "DOI": "10.13039/100000001", "award": ["DMR-1", "DMR-2"],
                 "id": [{"id": "021nxhr62", "id-type": "ROR", "asserted-by": "publisher"}]},
                {"name": "Sloan Foundation", "DOI": "10.13039/100000879"},
                {"name": "Anonymous"}
            ],
            "license": [
                {"URL": "https://creativecommons.org/licenses/by/4.0/", "content-version": "vor"},
                {"content-version": "tdm"}
            ],
            "link": [{"URL": "https://pubs.acs.org/doi/pdf/10.1021/acsami.7b15651", "content-type": "application/pdf"}],
            "published-print": {"date-parts": [[2018, 1, 24]]},
            "published-online": {"date-parts": [[2017, 12, 28]]}
        }))
        .unwrap()
    }

    fn ctx() -> CrosswalkContext {
        CrosswalkContext {
            vocab: Vocabularies::default().with_doi_prefix_publisher("10.1021", "ACS"),
            ..CrosswalkContext::default()
        }
    }

    #[test]
    fn journal_article_crosswalks() {
        let out = crossref_to_modern(&work(), &ctx(), &RorCache::new()).unwrap();
        let rec = out.record;
        assert_eq!(rec.pid("doi"), Some("10.1021/acsami.7b15651"));
        assert_eq!(rec.metadata.resource_type.id, "publication-article");
        assert_eq!(rec.metadata.title, "Foo Bar Materials");
        assert_eq!(rec.metadata.creators[0].person_or_org.family_name, "Doe");
        assert!(!rec.metadata.creators[2].person_or_org.is_personal());
        assert_eq!(rec.metadata.contributors[0].role_id(), "editor");
        assert_eq!(rec.metadata.publisher, "ACS");
        assert_eq!(rec.metadata.publication_date, "2017-12-28");
        assert_eq!(rec.custom_object("journal:journal").unwrap()["pages"], "2001-2010");
        assert_eq!(rec.pid("issn"), Some("1944-8244"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn funders_split_by_award() {
        let mut ror = RorCache::new();
        ror.insert("100000879".into(), Some("05gq02987".into()));
        let rec = crossref_to_modern(&work(), &ctx(), &ror).unwrap().record;
        let funding = &rec.metadata.funding;
        assert_eq!(funding.len(), 4);
        assert_eq!(funding[0].funder.id, "021nxhr62");
        assert_eq!(funding[1].award.as_ref().unwrap().number, "DMR-2");
        assert_eq!(funding[2].funder.id, "05gq02987");
        assert!(funding[2].award.is_none());
        assert_eq!(funding[3].funder.id, "");
        assert_eq!(funding[3].funder.scheme, "");
    }

    #[test]
    fn ror_keys_skip_publisher_asserted() {
        assert_eq!(funder_ror_keys(&work()), ["100000879"]);
    }

    #[test]
    fn licenses_and_links() {
        let rec = crossref_to_modern(&work(), &ctx(), &RorCache::new()).unwrap().record;
        assert_eq!(rec.metadata.rights.len(), 1);
        assert_eq!(rec.metadata.rights[0].link, "https://creativecommons.org/licenses/by/4.0/");
        let link = rec.metadata.identifiers.iter().find(|i| i.scheme == "url").unwrap();
        assert_eq!(link.name, "application/pdf");
    }

    #[test]
    fn shorter_date_wins_tie() {
        let w = CrossRefWork::from_json(&json!({
            "published-print": {"date-parts": [[2001, 2]]},
            "published-online": {"date-parts": [[2001, 2, 15]]}
        }))
        .unwrap();
        assert_eq!(pick_publication_date(&w).as_deref(), Some("2001-02"));

        let w = CrossRefWork::from_json(&json!({"accepted": {"date-parts": [[2000, 5, 1]]}})).unwrap();
        assert_eq!(pick_publication_date(&w).as_deref(), Some("2000-05-01"));
    }

    #[test]
    fn missing_doi_is_a_warning() {
        let w = CrossRefWork::from_json(&json!({"title": ["Untitled draft"]})).unwrap();
        let out = crossref_to_modern(&w, &ctx(), &RorCache::new()).unwrap();
        assert!(out.record.external_pids.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("DOI")));
    }
}

//! Small EPrints-shaped database used by the test suites of every crate.

use rusqlite::Connection;

use super::connection::LegacyDb;
use super::schema::create_tables;
use crate::error::Result;

pub const FIXTURE_BASE_URL: &str = "https://repo.example.edu";

const SEED: &str = "
INSERT INTO user (userid, username, name_given, name_family) VALUES (5, 'jdoe', 'Jane', 'Doe');
INSERT INTO subject (subjectid, rev_number) VALUES ('biology', 1), ('physics', 1);

INSERT INTO eprint (eprintid, rev_number, eprint_status, metadata_visibility, userid, dir, type,
    title, abstract, doi, issn, publication, volume, number, pagerange, publisher, keywords, note,
    date_year, date_month, date_type, ispublished, review_status,
    datestamp_year, datestamp_month, datestamp_day, datestamp_hour, datestamp_minute, datestamp_second,
    lastmod_year, lastmod_month, lastmod_day, lastmod_hour, lastmod_minute, lastmod_second)
VALUES (1, 3, 'archive', 'show', 5, 'disk0/00/00/00/01', 'article',
    'Foo', 'An abstract.', '10.1/x', '1234-5678', 'Journal of Foo', '12', '3', '100-110',
    'Foo Press', 'alpha; beta', 'Copyright 2019 the authors',
    2019, 7, 'published', 'pub', NULL,
    2020, 1, 2, 3, 4, 5,
    2021, 6, 15, 12, 0, 0);

INSERT INTO eprint_creators_name (eprintid, pos, creators_name_given, creators_name_family)
    VALUES (1, 0, 'Jane', 'Doe'), (1, 1, 'John', 'Smith');
INSERT INTO eprint_creators_id (eprintid, pos, creators_id) VALUES (1, 0, 'Doe-J'), (1, 1, 'Smith-J');
INSERT INTO eprint_creators_orcid (eprintid, pos, creators_orcid) VALUES (1, 0, '0000-0001-2345-6789');
INSERT INTO eprint_editors_name (eprintid, pos, editors_name_given, editors_name_family)
    VALUES (1, 0, 'Eve', 'Editor');
INSERT INTO eprint_funders_agency (eprintid, pos, funders_agency) VALUES (1, 0, 'NSF'), (1, 1, 'Sloan');
INSERT INTO eprint_funders_grant_number (eprintid, pos, funders_grant_number) VALUES (1, 0, 'AST-1');
INSERT INTO eprint_related_url_url (eprintid, pos, related_url_url)
    VALUES (1, 0, 'https://doi.org/10.2/y'), (1, 1, 'https://example.org/pub');
INSERT INTO eprint_related_url_type (eprintid, pos, related_url_type) VALUES (1, 0, 'doi'), (1, 1, 'pub');
INSERT INTO eprint_subjects (eprintid, pos, subjects) VALUES (1, 0, 'physics'), (1, 1, 'cls');
INSERT INTO eprint_local_group (eprintid, pos, local_group) VALUES (1, 0, 'Astronomy Department');
INSERT INTO eprint_alt_title (eprintid, pos, alt_title) VALUES (1, 0, 'Foo, Again');

INSERT INTO document (docid, eprintid, pos, rev_number, format, formatdesc, security, main,
    date_embargo_year, date_embargo_month, date_embargo_day, mime_type)
VALUES (10, 1, 1, 1, 'application/pdf', '', 'public', 'paper.pdf', 0, 0, 0, 'application/pdf'),
       (11, 1, 1, 2, 'application/pdf', '', 'staffonly', 'paper.pdf', 2030, 1, 1, 'application/pdf');
INSERT INTO file (fileid, datasetid, objectid, filename, mime_type, hash, hash_type, filesize)
    VALUES (7, 'document', 11, 'paper.pdf', 'application/pdf', 'abc123', 'MD5', 1234);
INSERT INTO document_relation_type (docid, pos, relation_type) VALUES (11, 0, 'isVersionOf');
INSERT INTO document_relation_uri (docid, pos, relation_uri) VALUES (11, 0, '/id/document/11');

INSERT INTO eprint (eprintid, rev_number, eprint_status, metadata_visibility, dir, type, title,
    lastmod_year, lastmod_month, lastmod_day)
VALUES (2, 1, 'inbox', 'show', 'disk0/00/00/00/02', 'monograph', 'Bar', 2022, 3, 1);
INSERT INTO eprint_local_group (eprintid, pos, local_group)
    VALUES (2, 0, 'One'), (2, 1, 'Two'), (2, 2, 'Three'), (2, 4, 'Five');

INSERT INTO eprint (eprintid, rev_number, eprint_status, metadata_visibility, dir, type, title,
    lastmod_year, lastmod_month, lastmod_day)
VALUES (3, 1, 'archive', 'no_search', 'disk0/00/00/00/03', 'book', 'Baz', 2021, 6, 20);
";

/// Create the schema and seed three records on `conn`.
pub fn seed(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    conn.execute_batch(SEED)?;
    Ok(())
}

/// In-memory database holding the seeded records.
pub fn seeded_db() -> Result<LegacyDb> {
    let conn = Connection::open_in_memory()?;
    seed(&conn)?;
    LegacyDb::from_connection(conn, FIXTURE_BASE_URL)
}

use papercat_core::db::open_db_in_memory;
use papercat_core::{
    ImportOutcome, Paper, PaperCatalog, PaperId, RepoError, SqlitePaperRepository, NO_ABSTRACT,
};
use std::collections::HashSet;
use uuid::Uuid;

fn ids(papers: &[Paper]) -> HashSet<PaperId> {
    papers.iter().map(|paper| paper.id).collect()
}

#[test]
fn exists_is_false_until_the_mendeley_id_is_inserted() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    assert!(!catalog.exists("8a1f-77").unwrap());
    assert!(!catalog.exists("").unwrap());

    catalog
        .import_paper(&Paper::new("Deep Learning").with_mendeley_id("8a1f-77"))
        .unwrap();

    assert!(catalog.exists("8a1f-77").unwrap());
    assert!(!catalog.exists("8A1F-77").unwrap());
    assert!(!catalog.exists("8a1f-7").unwrap());
}

#[test]
fn incomplete_paper_leaves_backlog_once_enriched() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let paper = Paper::new("Fresh import").with_mendeley_id("m-1");
    let id = catalog.import_paper(&paper).unwrap().paper_id();
    assert_eq!(ids(&catalog.papers_needing_completion().unwrap()), HashSet::from([id]));

    let enriched = catalog.record_enrichment(id, None).unwrap();
    assert_eq!(enriched.abstract_text, NO_ABSTRACT);
    assert!(catalog.papers_needing_completion().unwrap().is_empty());

    let enriched = catalog.record_enrichment(id, Some("Some real text")).unwrap();
    assert_eq!(enriched.abstract_text, "Some real text");
    assert!(catalog.papers_needing_completion().unwrap().is_empty());
    assert_eq!(
        catalog.get_paper(id).unwrap().unwrap().abstract_text,
        "Some real text"
    );
}

#[test]
fn backlog_contains_only_pending_papers() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let a = Paper::new("A");
    let b = Paper::new("B").with_abstract(NO_ABSTRACT);
    let c = Paper::new("C").with_abstract("text");
    for paper in [&a, &b, &c] {
        catalog.import_paper(paper).unwrap();
    }

    let backlog = catalog.papers_needing_completion().unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].id, a.id);
}

#[test]
fn backlog_follows_insertion_order_and_is_not_cached() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let first = Paper::new("first");
    let second = Paper::new("second");
    catalog.import_paper(&first).unwrap();
    catalog.import_paper(&second).unwrap();

    let backlog: Vec<_> = catalog
        .papers_needing_completion()
        .unwrap()
        .into_iter()
        .map(|paper| paper.id)
        .collect();
    assert_eq!(backlog, vec![first.id, second.id]);

    let third = Paper::new("third");
    catalog.import_paper(&third).unwrap();
    assert_eq!(catalog.papers_needing_completion().unwrap().len(), 3);
}

#[test]
fn count_papers_total_and_by_category() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());
    assert_eq!(catalog.count_papers(None).unwrap(), 0);

    let physics = Paper::new("Quantum");
    let both = Paper::new("Biophysics");
    let none = Paper::new("Uncategorized");
    for paper in [&physics, &both, &none] {
        catalog.import_paper(paper).unwrap();
    }
    catalog
        .set_categories(physics.id, &["Physics".to_string()])
        .unwrap();
    catalog
        .set_categories(both.id, &["Physics".to_string(), "Biology".to_string()])
        .unwrap();

    assert_eq!(catalog.count_papers(None).unwrap(), 3);
    assert_eq!(catalog.count_papers(Some("physics")).unwrap(), 2);
    assert_eq!(catalog.count_papers(Some(" PHYSICS ")).unwrap(), 2);
    assert_eq!(catalog.count_papers(Some("Biology")).unwrap(), 1);
    assert_eq!(catalog.count_papers(Some("Chemistry")).unwrap(), 0);
    assert_eq!(catalog.count_papers(Some("   ")).unwrap(), 0);
    assert_eq!(
        catalog.categories_of(both.id).unwrap(),
        vec!["biology", "physics"]
    );
    assert_eq!(catalog.list_categories().unwrap(), vec!["biology", "physics"]);
}

#[test]
fn get_description_concatenates_without_separator() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let paper = Paper::new("Deep Learning").with_abstract("A survey.");
    assert_eq!(catalog.get_description(&paper), "Deep LearningA survey.");
}

#[test]
fn import_deduplicates_by_mendeley_id() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let original = Paper::new("Original").with_mendeley_id("shared");
    let created = catalog.import_paper(&original).unwrap();
    assert_eq!(created, ImportOutcome::Created(original.id));

    let again = Paper::new("Re-imported copy").with_mendeley_id("shared");
    let outcome = catalog.import_paper(&again).unwrap();
    assert_eq!(outcome, ImportOutcome::AlreadyPresent(original.id));

    catalog.import_paper(&Paper::new("manual a")).unwrap();
    catalog.import_paper(&Paper::new("manual b")).unwrap();
    assert_eq!(catalog.count_papers(None).unwrap(), 3);
}

#[test]
fn record_enrichment_on_unknown_paper_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let id = Uuid::new_v4();
    let err = catalog.record_enrichment(id, Some("text")).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn blank_enrichment_text_records_no_abstract() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let id = catalog.import_paper(&Paper::new("p")).unwrap().paper_id();
    let paper = catalog.record_enrichment(id, Some("  \n ")).unwrap();
    assert_eq!(paper.abstract_text, NO_ABSTRACT);
}

#[test]
fn enrichment_text_is_stored_verbatim() {
    let conn = open_db_in_memory().unwrap();
    let catalog = PaperCatalog::new(SqlitePaperRepository::try_new(&conn).unwrap());

    let id = catalog.import_paper(&Paper::new("p")).unwrap().paper_id();
    let text = "  Abstract with padding.\n";
    let paper = catalog.record_enrichment(id, Some(text)).unwrap();
    assert_eq!(paper.abstract_text, text);

    let stored = catalog.get_paper(id).unwrap().unwrap();
    assert_eq!(stored.abstract_text, text);
    assert!(!catalog.papers_needing_completion().unwrap().contains(&stored));
}

//! End-to-end provisioning tests against in-memory collaborators

use pretty_assertions::assert_eq;
use texproj_core::error::{ROOT_DOC_CONTEXT, TEMPLATE_DOC_CONTEXT, TEMPLATE_FILE_CONTEXT};
use texproj_core::{
    BlankProject, HistoryId, HistoryRef, ProjectAttributes, ProvisionError, ProvisioningConfig,
    ProvisioningState, UserId, PROJECT_CREATED_EVENT, PROJECT_IMPORTED_EVENT, ROOT_DOC_NAME,
    ROOT_FOLDER_NAME,
};
use texproj_template::{bundled_templates_dir, RenderFault, TemplateDescriptor};
use texproj_test_utils::{lines, owner, setup_test_harness, template_tree, StoreCall, TestHarness};

fn ghost() -> UserId {
    UserId::new("ghost")
}

fn thesis_descriptor() -> TemplateDescriptor {
    TemplateDescriptor::new("thesis")
        .with_template_files(["main.tex", "chapter1.tex"])
        .with_static_files(["logo.png"])
}

#[tokio::test]
async fn test_blank_project_links_history() {
    let harness = setup_test_harness();

    let project = harness
        .provisioner
        .create_blank(&owner(), "Notes", BlankProject::default())
        .await
        .unwrap();

    assert_eq!(project.name, "Notes");
    assert_eq!(project.owner_ref, owner());
    assert_eq!(project.root_folder.name, ROOT_FOLDER_NAME);
    assert_eq!(project.history.id, Some(HistoryId("1".to_string())));
    assert!(!project.history.display);
    assert_eq!(project.spell_check_language.as_deref(), Some("en_GB"));
    assert_eq!(project.provisioning_state, ProvisioningState::Complete);
    assert!(project.root_doc_id.is_none());
    assert_eq!(harness.project(project.id), Some(project));

    assert_eq!(
        harness.store.calls(),
        vec![
            StoreCall::ValidateName("Notes".to_string()),
            StoreCall::InsertProject("Notes".to_string()),
            StoreCall::SetProvisioningState(ProvisioningState::Complete),
        ]
    );
}

#[tokio::test]
async fn test_blank_project_with_history_disabled() {
    let harness = TestHarness::builder().history_disabled().build();

    let project = harness
        .provisioner
        .create_blank(&owner(), "Notes", BlankProject::default())
        .await
        .unwrap();

    assert_eq!(project.history.id, None);
    assert!(project.is_complete());
}

#[tokio::test]
async fn test_history_display_follows_config() {
    let harness = TestHarness::builder()
        .config(ProvisioningConfig::new().with_display_history(true))
        .build();

    let project = harness
        .provisioner
        .create_blank(&owner(), "Notes", BlankProject::default())
        .await
        .unwrap();

    assert_eq!(project.history, HistoryRef::linked("1").with_display(true));
}

#[tokio::test]
async fn test_default_image_and_caller_attributes() {
    let harness = TestHarness::builder()
        .config(ProvisioningConfig::new().with_current_image("texlive-full:2024.1"))
        .build();

    let project = harness
        .provisioner
        .create_blank(
            &owner(),
            "Notes",
            BlankProject::new(ProjectAttributes::new().with_attribute("compiler", "xelatex")),
        )
        .await
        .unwrap();

    assert_eq!(project.image_name.as_deref(), Some("texlive-full:2024.1"));
    assert_eq!(project.attributes["compiler"], "xelatex");

    let events = harness.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, PROJECT_CREATED_EVENT);
    assert_eq!(events[0].payload["attributes"]["compiler"], "xelatex");
}

#[tokio::test]
async fn test_import_keeps_history_reference() {
    let harness = setup_test_harness();
    let history = HistoryRef::linked("legacy-7").with_display(true);

    let project = harness
        .provisioner
        .create_blank(
            &owner(),
            "Imported thesis",
            BlankProject::imported(
                history.clone(),
                ProjectAttributes::new()
                    .with_image_name("texlive:2017")
                    .with_attribute("fromV1", true),
            ),
        )
        .await
        .unwrap();

    assert_eq!(project.history, history);
    assert_eq!(project.image_name.as_deref(), Some("texlive:2017"));
    assert_eq!(harness.history.issued(), 0);

    let events = harness.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, PROJECT_IMPORTED_EVENT);
    assert_eq!(events[0].user_id, owner());
}

#[tokio::test]
async fn test_import_picks_up_configured_history_display() {
    let harness = TestHarness::builder()
        .config(ProvisioningConfig::new().with_display_history(true))
        .build();

    let project = harness
        .provisioner
        .create_blank(
            &owner(),
            "Imported notes",
            BlankProject::imported(HistoryRef::linked("9"), ProjectAttributes::new()),
        )
        .await
        .unwrap();

    assert_eq!(project.history, HistoryRef::linked("9").with_display(true));
    assert_eq!(harness.history.issued(), 0);
}

#[tokio::test]
async fn test_content_round_trips_into_root_doc() {
    let harness = setup_test_harness();
    let content = lines("\\documentclass{article}\n\\begin{document}\nHi\n\\end{document}\n");

    let project = harness
        .provisioner
        .create_from_content(&owner(), "Snippet", content.clone())
        .await
        .unwrap();

    assert_eq!(content.last().map(String::as_str), Some(""));
    assert_eq!(harness.root_doc_lines(&project), Some(content));
    assert_eq!(harness.project(project.id).unwrap().root_doc_id, project.root_doc_id);
    assert_eq!(
        harness.store.calls(),
        vec![
            StoreCall::ValidateName("Snippet".to_string()),
            StoreCall::InsertProject("Snippet".to_string()),
            StoreCall::AttachDocument(ROOT_DOC_NAME.to_string()),
            StoreCall::SetProvisioningState(ProvisioningState::ContentAttached),
            StoreCall::SetRootDocument,
            StoreCall::SetProvisioningState(ProvisioningState::Complete),
        ]
    );

    let events = harness.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["projectId"], serde_json::json!(project.id));
}

#[tokio::test]
async fn test_empty_content_creates_empty_root_doc() {
    let harness = setup_test_harness();

    let project = harness
        .provisioner
        .create_from_content(&owner(), "Empty", Vec::new())
        .await
        .unwrap();

    assert_eq!(harness.root_doc_lines(&project), Some(Vec::new()));
    assert!(project.is_complete());
}

#[tokio::test]
async fn test_starter_template_is_rendered() {
    let harness = setup_test_harness();

    let project = harness
        .provisioner
        .create_from_starter_template(&owner(), "My Paper")
        .await
        .unwrap();

    let doc = harness.root_doc_lines(&project).unwrap();
    assert!(doc.contains(&"\\title{My Paper}".to_string()));
    assert!(doc.contains(&"\\author{Ada Lovelace}".to_string()));
    assert!(doc.iter().any(|line| line.starts_with("\\date{")));
    assert!(doc.iter().all(|line| !line.contains("<%")));
    assert_eq!(doc.last().map(String::as_str), Some(""));

    let snapshot = harness.store.inner().snapshot(project.id).unwrap();
    assert_eq!(snapshot.documents.len(), 1);
    assert!(snapshot.files.is_empty());
}

#[tokio::test]
async fn test_example_template_attaches_statics() {
    let harness = setup_test_harness();

    let project = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "example")
        .await
        .unwrap();

    let snapshot = harness.store.inner().snapshot(project.id).unwrap();
    let documents: Vec<_> = snapshot.documents.iter().map(|d| d.name.as_str()).collect();
    let files: Vec<_> = snapshot.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(documents, vec![ROOT_DOC_NAME]);
    assert_eq!(files, vec!["references.bib", "universe.jpg"]);
    assert_eq!(project.root_doc_id, Some(snapshot.documents[0].id));

    let root = harness.root_doc_lines(&project).unwrap();
    assert!(root.contains(&"\\title{Thesis}".to_string()));

    let image = std::fs::read(bundled_templates_dir().join("example").join("universe.jpg")).unwrap();
    assert_eq!(snapshot.files[1].bytes, image);

    let events = harness.analytics.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["template"], "example");
}

#[tokio::test]
async fn test_custom_template_attaches_secondary_docs() {
    let dir = template_tree(&[
        ("thesis/main.tex", b"\\title{<%= project_name %>}\n\\input{chapter1}\n"),
        ("thesis/chapter1.tex", b"\\chapter{By <%= user.first_name %>}\n"),
        ("thesis/logo.png", &[0x89, b'P', b'N', b'G']),
    ]);
    let harness = TestHarness::builder()
        .templates(dir.path(), [("thesis", thesis_descriptor())])
        .build();

    let project = harness
        .provisioner
        .create_from_named_template(&owner(), "Dissertation", "thesis")
        .await
        .unwrap();

    let snapshot = harness.store.inner().snapshot(project.id).unwrap();
    assert_eq!(snapshot.documents.len(), 2);
    assert_eq!(snapshot.documents[0].name, ROOT_DOC_NAME);
    assert_eq!(snapshot.documents[0].lines, lines("\\title{Dissertation}\n\\input{chapter1}\n"));
    assert_eq!(snapshot.documents[1].name, "chapter1.tex");
    assert_eq!(snapshot.documents[1].lines, lines("\\chapter{By Ada}\n"));
    assert_eq!(snapshot.files[0].bytes, vec![0x89, b'P', b'N', b'G']);
    assert_eq!(project.root_doc_id, Some(snapshot.documents[0].id));
    assert!(project.is_complete());
}

#[tokio::test]
async fn test_unknown_template_persists_nothing() {
    let harness = setup_test_harness();

    let err = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "no-such-template")
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::TemplateNotFound { ref key } if key == "no-such-template"));
    assert!(err.is_template_error());
    assert!(!err.is_caller_error());
    assert_eq!(err.partial_project(), None);
    assert_eq!(
        harness.store.calls(),
        vec![StoreCall::ValidateName("Thesis".to_string())]
    );
    assert_eq!(harness.store.inner().project_count(), 0);
    assert_eq!(harness.history.issued(), 0);
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_render_fault_persists_nothing() {
    let dir = template_tree(&[
        ("thesis/main.tex", b"ok\n"),
        ("thesis/chapter1.tex", b"line one\n<%= user.email %>\n"),
        ("thesis/logo.png", b"png"),
    ]);
    let harness = TestHarness::builder()
        .templates(dir.path(), [("thesis", thesis_descriptor())])
        .build();

    let err = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "thesis")
        .await
        .unwrap_err();

    match err {
        ProvisionError::TemplateRender { line, fault, .. } => {
            assert_eq!(line, 2);
            assert_eq!(fault, RenderFault::UnknownPlaceholder("user.email".to_string()));
        }
        other => panic!("expected render error, got {other:?}"),
    }
    assert_eq!(harness.store.inner().project_count(), 0);
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_template_without_files_is_rejected() {
    let dir = template_tree(&[("bare/logo.png", b"png")]);
    let harness = TestHarness::builder()
        .templates(
            dir.path(),
            [("bare", TemplateDescriptor::new("bare").with_static_files(["logo.png"]))],
        )
        .build();

    let err = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "bare")
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::TemplateEmpty { ref key } if key == "bare"));
    assert_eq!(harness.store.inner().project_count(), 0);
}

#[tokio::test]
async fn test_invalid_names_create_nothing() {
    let harness = setup_test_harness();
    let too_long = "x".repeat(151);

    for name in ["", "a/b", "back\\slash", too_long.as_str()] {
        let err = harness
            .provisioner
            .create_from_content(&owner(), name, vec!["x".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidProjectName(_)), "{name:?}: {err}");
    }

    assert_eq!(harness.store.inner().project_count(), 0);
    assert_eq!(harness.history.issued(), 0);
    assert!(harness.analytics.events().is_empty());
    assert!(!harness
        .store
        .calls()
        .iter()
        .any(|call| matches!(call, StoreCall::InsertProject(_))));
}

#[tokio::test]
async fn test_unknown_owner_fails_before_insert() {
    let harness = setup_test_harness();

    let err = harness
        .provisioner
        .create_blank(&ghost(), "Notes", BlankProject::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::OwnerNotFound(ref id) if *id == ghost()));

    let err = harness
        .provisioner
        .create_from_starter_template(&ghost(), "Notes")
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::OwnerNotFound(_)));

    assert_eq!(harness.store.inner().project_count(), 0);
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_root_doc_failure_leaves_blank_project() {
    let harness = setup_test_harness();
    harness
        .store
        .fail_on(|call| matches!(call, StoreCall::AttachDocument(name) if name == ROOT_DOC_NAME));

    let err = harness
        .provisioner
        .create_from_content(&owner(), "Snippet", vec!["x".to_string()])
        .await
        .unwrap_err();

    let project_id = match &err {
        ProvisionError::EntityAttach {
            context,
            project_id,
            ..
        } => {
            assert_eq!(*context, ROOT_DOC_CONTEXT);
            *project_id
        }
        other => panic!("expected attach error, got {other:?}"),
    };
    assert!(err.to_string().starts_with(ROOT_DOC_CONTEXT));
    assert_eq!(err.partial_project(), Some(project_id));

    let stuck = harness.project(project_id).unwrap();
    assert_eq!(stuck.provisioning_state, ProvisioningState::Blank);
    assert!(stuck.root_doc_id.is_none());
    assert_eq!(harness.store.inner().incomplete_projects(), vec![stuck]);
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_static_file_failure_is_tagged() {
    let harness = setup_test_harness();
    harness
        .store
        .fail_on(|call| matches!(call, StoreCall::AttachFile(name) if name == "universe.jpg"));

    let err = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "example")
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::EntityAttach { context, .. } if context == TEMPLATE_FILE_CONTEXT));
    let project_id = err.partial_project().unwrap();
    let snapshot = harness.store.inner().snapshot(project_id).unwrap();
    assert_eq!(snapshot.project.provisioning_state, ProvisioningState::Blank);
    assert_eq!(snapshot.files.len(), 1);
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_secondary_doc_failure_is_tagged() {
    let dir = template_tree(&[
        ("thesis/main.tex", b"main\n"),
        ("thesis/chapter1.tex", b"chapter\n"),
        ("thesis/logo.png", b"png"),
    ]);
    let harness = TestHarness::builder()
        .templates(dir.path(), [("thesis", thesis_descriptor())])
        .build();
    harness
        .store
        .fail_on(|call| matches!(call, StoreCall::AttachDocument(name) if name == "chapter1.tex"));

    let err = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "thesis")
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::EntityAttach { context, .. } if context == TEMPLATE_DOC_CONTEXT));
    assert!(!harness.store.calls().iter().any(|call| matches!(call, StoreCall::AttachFile(_))));
}

#[tokio::test]
async fn test_root_designation_failure_leaves_content_attached() {
    let harness = setup_test_harness();
    harness
        .store
        .fail_on(|call| matches!(call, StoreCall::SetRootDocument));

    let err = harness
        .provisioner
        .create_from_starter_template(&owner(), "Paper")
        .await
        .unwrap_err();

    let project_id = err.partial_project().unwrap();
    let stuck = harness.project(project_id).unwrap();
    assert_eq!(stuck.provisioning_state, ProvisioningState::ContentAttached);
    assert!(stuck.root_doc_id.is_none());
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_insert_failure_is_persist_error() {
    let harness = setup_test_harness();
    harness
        .store
        .fail_on(|call| matches!(call, StoreCall::InsertProject(_)));

    let err = harness
        .provisioner
        .create_blank(&owner(), "Notes", BlankProject::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Persist(_)));
    assert_eq!(err.partial_project(), None);
    assert_eq!(harness.store.inner().project_count(), 0);
}

#[tokio::test]
async fn test_analytics_outage_does_not_fail_creation() {
    let harness = setup_test_harness();
    harness.analytics.set_failing(true);

    let project = harness
        .provisioner
        .create_from_named_template(&owner(), "Thesis", "example")
        .await
        .unwrap();

    assert!(project.is_complete());
    assert!(harness.analytics.events().is_empty());
}

#[tokio::test]
async fn test_concurrent_creations_are_independent() {
    let harness = std::sync::Arc::new(setup_test_harness());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let harness = harness.clone();
            tokio::spawn(async move {
                harness
                    .provisioner
                    .create_from_content(&owner(), &format!("Project {i}"), vec![format!("doc {i}")])
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let project = handle.await.unwrap().unwrap();
        assert_eq!(harness.root_doc_lines(&project), Some(vec![format!("doc {}", &project.name[8..])]));
        ids.push(project.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(harness.history.issued(), 8);
    assert_eq!(harness.analytics.events().len(), 8);
}

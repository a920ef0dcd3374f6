//! Project provisioner
//!
//! Sequences name validation, history linkage, blank-project persistence, template
//! rendering and entity attachment for each creation mode:
//! - blank
//! - raw content (snippet)
//! - the fixed starter template
//! - a named multi-file template
//!
//! Progress is recorded on the project as `Blank → ContentAttached → Complete`. A
//! failure after the blank project is persisted leaves it in its last recorded state
//! and is returned tagged with the stage; nothing is rolled back. Exactly one
//! analytics event is recorded per successful operation.

use crate::config::ProvisioningConfig;
use crate::error::{ProvisionError, ROOT_DOC_CONTEXT, TEMPLATE_DOC_CONTEXT, TEMPLATE_FILE_CONTEXT};
use crate::factory::EntityFactory;
use crate::history::HistoryLinker;
use crate::ports::{AnalyticsSink, CollaboratorError, Collaborators, EntityStore, UserDirectory};
use crate::types::{
    BlankProject, DocumentId, FileSource, Project, ProvisioningState, UserField, UserId,
    ROOT_DOC_NAME,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use texproj_template::{RenderContext, TemplateRegistry, TemplateRenderer, BASIC_TEMPLATE};

/// Analytics event for newly created projects
pub const PROJECT_CREATED_EVENT: &str = "project-created";

/// Analytics event for imported projects
pub const PROJECT_IMPORTED_EVENT: &str = "project-imported";

/// Entity attached after the root document
#[derive(Debug)]
enum Attachment {
    Document { name: String, lines: Vec<String> },
    File { name: String, source: FileSource },
}

/// Provisions new projects
pub struct ProjectProvisioner {
    store: Arc<dyn EntityStore>,
    users: Arc<dyn UserDirectory>,
    analytics: Arc<dyn AnalyticsSink>,
    history: HistoryLinker,
    factory: EntityFactory,
    renderer: TemplateRenderer,
    registry: Arc<TemplateRegistry>,
}

impl ProjectProvisioner {
    /// Create provisioner wired to `collaborators`
    ///
    /// The template registry and renderer are built from `config` once here.
    #[must_use]
    pub fn new(collaborators: Collaborators, config: &ProvisioningConfig) -> Self {
        let Collaborators {
            store,
            history,
            users,
            analytics,
        } = collaborators;

        Self {
            history: HistoryLinker::new(history, config.history.display_for_new_projects),
            factory: EntityFactory::new(
                Arc::clone(&store),
                Arc::clone(&users),
                config.compile.current_image_name.clone(),
            ),
            renderer: config.template_renderer(),
            registry: Arc::new(config.template_registry()),
            store,
            users,
            analytics,
        }
    }

    /// Replace the template registry and renderer
    #[must_use]
    pub fn with_templates(mut self, registry: TemplateRegistry, renderer: TemplateRenderer) -> Self {
        self.registry = Arc::new(registry);
        self.renderer = renderer;
        self
    }

    /// Template registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Create a project with no documents
    ///
    /// New projects get a fresh history id and a `project-created` event; imports keep
    /// their history reference and get a `project-imported` event.
    pub async fn create_blank(
        &self,
        owner_id: &UserId,
        name: &str,
        origin: BlankProject,
    ) -> Result<Project, ProvisionError> {
        let started = begin("blank");
        let event = if origin.is_import() {
            PROJECT_IMPORTED_EVENT
        } else {
            PROJECT_CREATED_EVENT
        };
        let attributes = match serde_json::to_value(origin.attributes()) {
            Ok(attributes) => attributes,
            Err(err) => {
                tracing::warn!("Omitting attributes from {} event for {}: {}", event, owner_id, err);
                serde_json::Value::Null
            }
        };

        let project = failed_on("blank", owner_id, self.blank_steps(owner_id, name, origin).await)?;
        self.record_completion(
            owner_id,
            event,
            json!({ "projectId": project.id, "attributes": attributes }),
        )
        .await;
        finish("blank", started, &project);
        Ok(project)
    }

    /// Create a project whose root document holds `lines` verbatim
    pub async fn create_from_content(
        &self,
        owner_id: &UserId,
        name: &str,
        lines: Vec<String>,
    ) -> Result<Project, ProvisionError> {
        let started = begin("content");
        let project = failed_on(
            "content",
            owner_id,
            self.content_steps(owner_id, name, lines).await,
        )?;
        self.record_completion(owner_id, PROJECT_CREATED_EVENT, json!({ "projectId": project.id }))
            .await;
        finish("content", started, &project);
        Ok(project)
    }

    /// Create a project from the fixed starter template
    pub async fn create_from_starter_template(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<Project, ProvisionError> {
        let started = begin("basic");
        let project = failed_on("basic", owner_id, self.starter_steps(owner_id, name).await)?;
        self.record_completion(owner_id, PROJECT_CREATED_EVENT, json!({ "projectId": project.id }))
            .await;
        finish("basic", started, &project);
        Ok(project)
    }

    /// Create a project from a named template
    ///
    /// The key is resolved and every renderable file rendered before the blank
    /// project is persisted, so template problems never leave a project behind.
    pub async fn create_from_named_template(
        &self,
        owner_id: &UserId,
        name: &str,
        template_key: &str,
    ) -> Result<Project, ProvisionError> {
        let started = begin("template");
        let project = failed_on(
            "template",
            owner_id,
            self.named_template_steps(owner_id, name, template_key).await,
        )?;
        self.record_completion(
            owner_id,
            PROJECT_CREATED_EVENT,
            json!({ "projectId": project.id, "template": template_key }),
        )
        .await;
        finish("template", started, &project);
        Ok(project)
    }

    async fn blank_steps(
        &self,
        owner_id: &UserId,
        name: &str,
        origin: BlankProject,
    ) -> Result<Project, ProvisionError> {
        self.validate_name(name).await?;
        let mut project = self.create_blank_unchecked(owner_id, name, origin).await?;
        self.mark(&mut project, ProvisioningState::Complete).await?;
        Ok(project)
    }

    async fn content_steps(
        &self,
        owner_id: &UserId,
        name: &str,
        lines: Vec<String>,
    ) -> Result<Project, ProvisionError> {
        self.validate_name(name).await?;
        self.provision_with_root(owner_id, name, lines, Vec::new()).await
    }

    async fn starter_steps(&self, owner_id: &UserId, name: &str) -> Result<Project, ProvisionError> {
        self.validate_name(name).await?;
        let context = self.render_context(owner_id, name).await?;
        let lines = self
            .renderer
            .render(Path::new(BASIC_TEMPLATE), &context)
            .await?;
        self.provision_with_root(owner_id, name, lines, Vec::new()).await
    }

    async fn named_template_steps(
        &self,
        owner_id: &UserId,
        name: &str,
        template_key: &str,
    ) -> Result<Project, ProvisionError> {
        self.validate_name(name).await?;
        let descriptor = self.registry.resolve(template_key)?;
        let context = self.render_context(owner_id, name).await?;

        let mut rendered = Vec::with_capacity(descriptor.template_files.len());
        for file_name in &descriptor.template_files {
            let lines = self
                .renderer
                .render(&descriptor.file_path(file_name), &context)
                .await?;
            rendered.push((file_name.clone(), lines));
        }

        let mut rendered = rendered.into_iter();
        let Some((_, root_lines)) = rendered.next() else {
            return Err(ProvisionError::TemplateEmpty {
                key: template_key.to_string(),
            });
        };

        // static files always follow every renderable file
        let mut rest: Vec<Attachment> = rendered
            .map(|(name, lines)| Attachment::Document { name, lines })
            .collect();
        rest.extend(descriptor.static_files.iter().map(|file_name| Attachment::File {
            name: file_name.clone(),
            source: FileSource::Path(self.renderer.resolve(&descriptor.file_path(file_name))),
        }));

        self.provision_with_root(owner_id, name, root_lines, rest).await
    }

    async fn validate_name(&self, name: &str) -> Result<(), ProvisionError> {
        if name.trim().is_empty() {
            return Err(ProvisionError::InvalidProjectName(
                "Project name cannot be blank".to_string(),
            ));
        }
        self.store.validate_name(name).await.map_err(|err| match err {
            CollaboratorError::InvalidName(reason) => ProvisionError::InvalidProjectName(reason),
            other => ProvisionError::NameValidation(other),
        })
    }

    async fn create_blank_unchecked(
        &self,
        owner_id: &UserId,
        name: &str,
        origin: BlankProject,
    ) -> Result<Project, ProvisionError> {
        let history = self.history.resolve(&origin).await?;
        let attributes = match origin {
            BlankProject::New(attributes) => attributes,
            BlankProject::Imported(imported) => imported.attributes,
        };
        self.factory.instantiate(owner_id, name, history, attributes).await
    }

    async fn provision_with_root(
        &self,
        owner_id: &UserId,
        name: &str,
        root_lines: Vec<String>,
        rest: Vec<Attachment>,
    ) -> Result<Project, ProvisionError> {
        let mut project = self
            .create_blank_unchecked(owner_id, name, BlankProject::default())
            .await?;
        let root_doc = self.attach_root_doc(&project, owner_id, &root_lines).await?;
        for attachment in rest {
            self.attach(&project, owner_id, attachment).await?;
        }
        self.mark(&mut project, ProvisioningState::ContentAttached).await?;
        self.designate_root_doc(&mut project, root_doc).await?;
        self.mark(&mut project, ProvisioningState::Complete).await?;
        Ok(project)
    }

    async fn attach_root_doc(
        &self,
        project: &Project,
        owner_id: &UserId,
        lines: &[String],
    ) -> Result<DocumentId, ProvisionError> {
        self.store
            .attach_document(project.id, project.root_folder.id, ROOT_DOC_NAME, lines, owner_id)
            .await
            .map_err(ProvisionError::attach(ROOT_DOC_CONTEXT, project.id))
    }

    async fn designate_root_doc(
        &self,
        project: &mut Project,
        document_id: DocumentId,
    ) -> Result<(), ProvisionError> {
        self.store
            .set_root_document(project.id, document_id)
            .await
            .map_err(ProvisionError::attach(ROOT_DOC_CONTEXT, project.id))?;
        project.root_doc_id = Some(document_id);
        Ok(())
    }

    async fn attach(
        &self,
        project: &Project,
        owner_id: &UserId,
        attachment: Attachment,
    ) -> Result<(), ProvisionError> {
        let folder_id = project.root_folder.id;
        match attachment {
            Attachment::Document { name, lines } => {
                self.store
                    .attach_document(project.id, folder_id, &name, &lines, owner_id)
                    .await
                    .map_err(ProvisionError::attach(TEMPLATE_DOC_CONTEXT, project.id))?;
                tracing::debug!("Attached document {} to project {}", name, project.id);
            }
            Attachment::File { name, source } => {
                self.store
                    .attach_file(project.id, folder_id, &name, source, owner_id)
                    .await
                    .map_err(ProvisionError::attach(TEMPLATE_FILE_CONTEXT, project.id))?;
                tracing::debug!("Attached file {} to project {}", name, project.id);
            }
        }
        Ok(())
    }

    async fn mark(&self, project: &mut Project, state: ProvisioningState) -> Result<(), ProvisionError> {
        self.store
            .set_provisioning_state(project.id, state)
            .await
            .map_err(|source| ProvisionError::StateUpdate {
                project_id: project.id,
                state,
                source,
            })?;
        project.provisioning_state = state;
        Ok(())
    }

    async fn render_context(&self, owner_id: &UserId, name: &str) -> Result<RenderContext, ProvisionError> {
        let user = self
            .users
            .find_user(owner_id, &[UserField::FirstName, UserField::LastName])
            .await
            .map_err(|source| ProvisionError::UserLookup {
                user_id: owner_id.clone(),
                source,
            })?
            .ok_or_else(|| ProvisionError::OwnerNotFound(owner_id.clone()))?;
        Ok(RenderContext::now(name, user.to_projection()))
    }

    async fn record_completion(&self, owner_id: &UserId, event: &str, payload: serde_json::Value) {
        if let Err(err) = self.analytics.record_event(owner_id, event, payload).await {
            tracing::warn!("Failed to record {} event for {}: {}", event, owner_id, err);
        }
    }
}

impl std::fmt::Debug for ProjectProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectProvisioner")
            .field("history", &self.history)
            .field("factory", &self.factory)
            .field("renderer", &self.renderer)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn begin(mode: &'static str) -> Instant {
    metrics::counter!("project_creation_total", "mode" => mode).increment(1);
    Instant::now()
}

fn finish(mode: &'static str, started: Instant, project: &Project) {
    metrics::histogram!("project_creation_seconds", "mode" => mode)
        .record(started.elapsed().as_secs_f64());
    tracing::info!("Provisioned project {} ({}) in {} mode", project.id, project.name, mode);
}

fn failed_on(
    mode: &'static str,
    owner_id: &UserId,
    result: Result<Project, ProvisionError>,
) -> Result<Project, ProvisionError> {
    if let Err(err) = &result {
        match err.partial_project() {
            Some(project_id) => tracing::error!(
                "Provisioning ({}) for {} failed, project {} left incomplete: {}",
                mode,
                owner_id,
                project_id,
                err
            ),
            None => tracing::error!("Provisioning ({}) for {} failed: {}", mode, owner_id, err),
        }
    }
    result
}

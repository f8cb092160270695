use std::{collections::HashMap, path::PathBuf, sync::Arc};

use acyclic_loader::{GraphBuilder, LoaderGraph};

/// Where the template is read from, overwritten from the command line
#[derive(Debug, Clone)]
pub struct TemplateSource(pub Option<PathBuf>);

/// In-memory stand-in for a database
#[derive(Debug)]
pub struct Database {
    users: HashMap<u32, String>,
}
impl Database {
    pub fn user_by_age(&self, age: u32) -> Option<&str> {
        self.users.get(&age).map(String::as_str)
    }
}

pub struct Handler {
    template: Arc<String>,
    database: Arc<Database>,
}
impl Handler {
    pub fn handle(&self, age: u32) -> String {
        let name = self.database.user_by_age(age).unwrap_or("stranger");
        self.template.replace("<name>", name)
    }
}

pub struct Server {
    pub addr: String,
    pub handler: Arc<Handler>,
}

acyclic_loader::dependencies! {
    pub struct TemplateOptions {
        pub source: Arc<TemplateSource> => "TemplateSource",
    }
}

acyclic_loader::dependencies! {
    pub struct HandlerOptions {
        pub template: Arc<String> => "Template",
        pub database: Arc<Database> => "Database",
    }
}

acyclic_loader::dependencies! {
    pub struct ServerOptions {
        pub port: Arc<u16> => "Port",
        pub handler: Arc<Handler> => "Handler",
    }
}

/// All components making up the application
///
/// `Template` and `Database` have no dependency on each other and load concurrently
pub fn components() -> LoaderGraph {
    GraphBuilder::new()
        .spawner(|task| {
            tokio::spawn(task);
        })
        .provide("Port", || async { 80_u16 })
        .provide("TemplateSource", || async { TemplateSource(None) })
        .try_provide_with("Template", |options: TemplateOptions| async move {
            match &options.source.0 {
                Some(path) => tokio::fs::read_to_string(path).await,
                None => Ok("Hello <name>!".to_string()),
            }
        })
        .try_provide("Database", || async {
            let users = HashMap::from([(29, "Alice".to_string()), (42, "Bob".to_string())]);
            Ok::<_, std::io::Error>(Database { users })
        })
        .provide_with("Handler", |options: HandlerOptions| async move {
            Handler {
                template: options.template,
                database: options.database,
            }
        })
        .provide_with("Server", |options: ServerOptions| async move {
            Server {
                addr: format!(":{}", options.port),
                handler: options.handler,
            }
        })
        .must_build()
}

#[cfg(test)]
mod tests {
    use acyclic_loader::Overwrites;

    use super::*;

    #[tokio::test]
    async fn wires_the_server() {
        let server = components().must_load_as::<Server>("Server").await;
        assert_eq!(server.addr, ":80");
        assert_eq!(server.handler.handle(29), "Hello Alice!");
    }

    #[tokio::test]
    async fn mocks_the_database() {
        let database = Database {
            users: HashMap::from([(29, "Mallory".to_string())]),
        };
        let server = components()
            .with_overwrites(
                Overwrites::new()
                    .set("Port", 60000_u16)
                    .set("Database", database),
            )
            .unwrap()
            .must_load_as::<Server>("Server")
            .await;

        assert_eq!(server.addr, ":60000");
        assert_eq!(server.handler.handle(29), "Hello Mallory!");
    }

    #[tokio::test]
    async fn missing_template_fails_the_server() {
        let loader = components()
            .with_overwrites(
                Overwrites::new().set("TemplateSource", TemplateSource(Some("/nonexistent".into()))),
            )
            .unwrap();

        let error = loader.load("Server").await.unwrap_err();
        assert!(error
            .to_string()
            .starts_with("failed to load dependency Server -> Handler -> Template"));
    }
}

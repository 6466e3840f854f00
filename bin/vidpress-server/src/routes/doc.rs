use crate::routes::compress::CompressApi;
use crate::routes::health::HealthApi;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "vidpress-server",
    description = "Upload a video, get back a smaller one",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(HealthApi::openapi());
    root.merge(CompressApi::openapi());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn docs_list_every_route() {
        let docs = get_docs();
        assert!(docs.paths.paths.contains_key("/health"));
        assert!(docs.paths.paths.contains_key("/compress"));
    }
}

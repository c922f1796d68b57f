use anyhow::Result;

use crate::models::BuildRequest;

pub trait ImageBuilder {
    fn build(&mut self, request: &BuildRequest) -> Result<()>;
}

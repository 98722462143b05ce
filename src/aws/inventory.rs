//! Ownership-filtered listing and cascading deletion of registered images.

use tracing::{info, warn};

use super::AwsProvider;
use super::types::{Ec2Image, Filter};
use crate::error::OpsError;
use crate::process::CommandRunner;
use crate::provider::CloudImage;

fn project(image: &Ec2Image) -> CloudImage {
    CloudImage {
        name: image.display_name().to_owned(),
        id: image
            .name
            .clone()
            .unwrap_or_else(|| image.image_id.clone()),
        status: image.state.clone().unwrap_or_default(),
        created: image.creation_date.clone().unwrap_or_default(),
    }
}

impl<R: CommandRunner> AwsProvider<R> {
    /// Images carrying the ownership tag. The server-side filter is
    /// re-checked locally so an untagged image is never reported.
    pub(super) fn owned_images(&self) -> Result<Vec<CloudImage>, OpsError> {
        let images = self.ec2.describe_images(&[Filter::ownership()])?;
        Ok(images
            .iter()
            .filter(|image| image.is_owned())
            .map(project)
            .collect())
    }

    pub(super) fn delete_owned(&self, name: &str) -> Result<(), OpsError> {
        let images = self
            .ec2
            .describe_images(&[Filter::new("name", name), Filter::ownership()])?;
        let image = images
            .into_iter()
            .find(|image| image.is_owned() && image.name.as_deref() == Some(name))
            .ok_or_else(|| OpsError::image_not_found(name))?;
        let snapshot_id = image.root_snapshot_id().map(str::to_owned);

        info!(image = %image.image_id, "Deregistering image");
        self.ec2.deregister_image(&image.image_id)?;

        snapshot_id.map_or_else(
            || {
                warn!(image = %image.image_id, "image has no EBS snapshot to delete");
                Ok(())
            },
            |snapshot| {
                info!(%snapshot, "Deleting snapshot");
                self.ec2.delete_snapshot(&snapshot)
            },
        )
    }
}

mod metadata;

pub use metadata::{
    resolve_or_placeholder, MetadataResolver, PlaceholderResolver, YoutubeResolver,
};

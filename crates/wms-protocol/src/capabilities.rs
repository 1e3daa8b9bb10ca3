//! WMS GetCapabilities document.

use wms_common::{BoundingBox, CrsCode};

use crate::exceptions::xml_escape;
use crate::getmap::SUPPORTED_FORMATS;

/// A layer as advertised in capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub name: String,
    pub title: String,
    /// Geographic extent (lon/lat), if the layer has any placed chart.
    pub geo_bbox: Option<BoundingBox>,
    pub queryable: bool,
}

/// Builds the capabilities XML for either protocol version.
#[derive(Debug, Clone)]
pub struct CapabilitiesBuilder {
    base_url: String,
    title: String,
    layers: Vec<LayerInfo>,
}

impl CapabilitiesBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            title: "Nautical charts".to_string(),
            layers: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn layer(mut self, layer: LayerInfo) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(mut self, layers: impl IntoIterator<Item = LayerInfo>) -> Self {
        self.layers.extend(layers);
        self
    }

    /// MIME type of the document for `version`.
    pub fn content_type(version: &str) -> &'static str {
        if version == "1.3.0" {
            "text/xml"
        } else {
            "application/vnd.ogc.wms_xml"
        }
    }

    pub fn build(&self, version: &str) -> String {
        let v130 = version == "1.3.0";
        let crs_tag = if v130 { "CRS" } else { "SRS" };
        let href = xml_escape(&format!("{}/wms?", self.base_url.trim_end_matches('/')));
        let online = format!(
            r#"<DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="{}"/></Get></HTTP></DCPType>"#,
            href
        );

        let crs_list: String = CrsCode::ALL
            .iter()
            .map(|c| format!("<{0}>{1}</{0}>", crs_tag, c))
            .collect();
        let map_formats: String = SUPPORTED_FORMATS
            .iter()
            .map(|f| format!("<Format>{}</Format>", f))
            .collect();

        let layers: String = self
            .layers
            .iter()
            .map(|l| self.layer_xml(l, v130))
            .collect::<Vec<_>>()
            .join("\n      ");

        let (root_open, root_close, exception_format) = if v130 {
            (
                r#"<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">"#
                    .to_string(),
                "</WMS_Capabilities>",
                "XML",
            )
        } else {
            (
                r#"<WMT_MS_Capabilities version="1.1.1" xmlns:xlink="http://www.w3.org/1999/xlink">"#
                    .to_string(),
                "</WMT_MS_Capabilities>",
                "application/vnd.ogc.se_xml",
            )
        };
        let service_name = if v130 { "WMS" } else { "OGC:WMS" };
        let capabilities_format = Self::content_type(version);

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
{root_open}
  <Service>
    <Name>{service_name}</Name>
    <Title>{title}</Title>
    <OnlineResource xlink:type="simple" xlink:href="{href}"/>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities><Format>{capabilities_format}</Format>{online}</GetCapabilities>
      <GetMap>{map_formats}{online}</GetMap>
      <GetFeatureInfo><Format>text/html</Format><Format>application/json</Format><Format>text/plain</Format>{online}</GetFeatureInfo>
    </Request>
    <Exception><Format>{exception_format}</Format></Exception>
    <Layer>
      <Title>{title}</Title>
      {crs_list}
      {layers}
    </Layer>
  </Capability>
{root_close}"#,
            title = xml_escape(&self.title),
        )
    }

    fn layer_xml(&self, layer: &LayerInfo, v130: bool) -> String {
        let extent = layer
            .geo_bbox
            .map(|b| {
                if v130 {
                    format!(
                        r#"<EX_GeographicBoundingBox><westBoundLongitude>{}</westBoundLongitude><eastBoundLongitude>{}</eastBoundLongitude><southBoundLatitude>{}</southBoundLatitude><northBoundLatitude>{}</northBoundLatitude></EX_GeographicBoundingBox><BoundingBox CRS="CRS:84" minx="{}" miny="{}" maxx="{}" maxy="{}"/>"#,
                        b.min_x, b.max_x, b.min_y, b.max_y, b.min_x, b.min_y, b.max_x, b.max_y
                    )
                } else {
                    format!(
                        r#"<LatLonBoundingBox minx="{}" miny="{}" maxx="{}" maxy="{}"/>"#,
                        b.min_x, b.min_y, b.max_x, b.max_y
                    )
                }
            })
            .unwrap_or_default();
        format!(
            r#"<Layer queryable="{}"><Name>{}</Name><Title>{}</Title>{}</Layer>"#,
            if layer.queryable { 1 } else { 0 },
            xml_escape(&layer.name),
            xml_escape(&layer.title),
            extent
        )
    }
}

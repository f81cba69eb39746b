/*!

This is the long-form manual for `zip_interpolation` and `zipvote`.

## Inputs

All the inputs describe a single county.

### Census gazetteer

One row per census tract: the full geographic identifier (`GEOID`, state and county
FIPS followed by the 6-digit tract number) and the internal point of the tract
(`INTPTLONG`, `INTPTLAT`). Only the tracts whose identifier starts with the county
FIPS prefix are kept. The internal point stands for the whole tract: the method does
not compute polygon overlaps.

### ZIP code boundaries

A GeoJSON `FeatureCollection`. Each feature is a `Polygon` or a `MultiPolygon`; only
the outer ring of every polygon is used, holes are ignored. The ZIP code is read from
a feature property (`ZIPCODE` by default).

### Block to precinct allocation

One row per census block and precinct, with the precinct (`srprec`), the tract number
without county prefix (`tract`) and the share of the precinct's registration in the
block (`pctsrprec`). The share may be a fraction or a percentage; with the `auto`
setting, the feed is read as percentages as soon as one share is above 1.

### Precinct to city lookup

One row per precinct (`srprec`, `city`). Precincts with a blank city are aggregated
as `Unincorporated`, as are precincts missing from the lookup (these are listed as
`Unknown` in the precinct list).

### Statement of votes

One row per precinct, one column per candidate. The candidate columns change from one
election to the next, so they are part of the configuration of every year.

## Method

* A tract centroid belongs to the first ZIP code, in the order of the boundary file,
  whose polygon contains it (ray casting). Centroids lying exactly on a boundary may
  go either way. Tracts outside every ZIP code stay unresolved.
* The positive shares of a precinct are added per ZIP code. Shares of unresolved
  tracts go to the `Unknown` ZIP code. The sums are then divided by the precinct total,
  so that the weights of a precinct add up to 1.
* A precinct with no positive share has no weights: its votes go to `Unknown`.
* The votes of a precinct are multiplied by each weight. The ZIP tallies are therefore
  fractional; they are only rounded in the output.
* Precincts without any vote are ignored.

## Output

```text
{
  "meta": { "source": ..., "county": ..., "granularity": ..., "generated": ... },
  "elections": {
    "2024": {
      "year": "2024",
      "county": "San Diego",
      "total_votes": 150,
      "num_precincts": 2,
      "candidates": { "Harris": { "votes": 70, "percentage": 46.67 }, ... },
      "precincts": [ { "precinct": "P1", "total": 100, "city": "CityX", "Harris": 60, ... } ],
      "by_city": { "CityX": { "total_votes": 150, "candidates": { ... } } },
      "by_zipcode": {
        "90001": { "total_votes": 100, "candidates": { ... }, "precinct_count": 1, "precinct_ids": ["P1"] }
      }
    }
  }
}
```

Votes are rounded to the nearest integer (ties to even) and percentages to 2 decimals.
Candidates with no rounded vote in a scope are omitted from that scope. Cities and ZIP
codes with fewer than 10 votes (configurable) are omitted, but their votes still count
in the county totals. The `Unknown` ZIP code is never reported.

*/
